//! 单元注册表
//!
//! 原始节点 ↔ 影子节点、指纹 ↔ 原始节点的双向映射。
//! 条目一旦建立就作为"已处理"标记长期保留，只有整棵子树被移除时才会被逐出。

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

/// 影子节点标记，每次构建时由注册表重新分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShadowId(u64);

impl ShadowId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 节点身份：`Rc` 指针地址
///
/// 注册表持有节点的强引用，因此条目存活期间地址不会被复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn of(node: &Handle) -> Self {
        NodeKey(Rc::as_ptr(node) as usize)
    }
}

/// 注册表条目
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub original: Handle,
    pub shadow: ShadowId,
    pub id: Option<String>,
}

/// 单元注册表，归属于单个引擎实例
#[derive(Debug, Default)]
pub struct UnitRegistry {
    entries: HashMap<NodeKey, RegistryEntry>,
    by_shadow: HashMap<ShadowId, NodeKey>,
    by_id: HashMap<String, NodeKey>,
    next_shadow: u64,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配新的影子标记
    pub fn next_shadow_id(&mut self) -> ShadowId {
        self.next_shadow += 1;
        ShadowId(self.next_shadow)
    }

    /// 登记原始节点与影子节点的对应关系
    ///
    /// 原始节点已登记时只替换影子一侧，保留已分配的指纹。返回是否为新条目。
    pub fn add(&mut self, original: &Handle, shadow: ShadowId) -> bool {
        let key = NodeKey::of(original);

        if let Some(entry) = self.entries.get_mut(&key) {
            self.by_shadow.remove(&entry.shadow);
            entry.shadow = shadow;
            self.by_shadow.insert(shadow, key);
            return false;
        }

        self.entries.insert(
            key,
            RegistryEntry {
                original: original.clone(),
                shadow,
                id: None,
            },
        );
        self.by_shadow.insert(shadow, key);
        true
    }

    pub fn contains(&self, original: &Handle) -> bool {
        self.entries.contains_key(&NodeKey::of(original))
    }

    pub fn find_by_original(&self, original: &Handle) -> Option<&RegistryEntry> {
        self.entries.get(&NodeKey::of(original))
    }

    pub fn find_by_shadow(&self, shadow: ShadowId) -> Option<&RegistryEntry> {
        self.by_shadow.get(&shadow).and_then(|key| self.entries.get(key))
    }

    /// 按指纹查找，供合并使用；已被逐出的指纹返回 `None`
    pub fn find_by_id(&self, id: &str) -> Option<&RegistryEntry> {
        self.by_id.get(id).and_then(|key| self.entries.get(key))
    }

    /// 为影子标记对应的条目记录指纹
    ///
    /// 同一指纹被多个节点使用时以最新的为准。
    pub fn assign_id(&mut self, shadow: ShadowId, id: &str) -> bool {
        let Some(&key) = self.by_shadow.get(&shadow) else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };

        if let Some(previous) = entry.id.replace(id.to_string()) {
            if previous != id && self.by_id.get(&previous) == Some(&key) {
                self.by_id.remove(&previous);
            }
        }
        self.by_id.insert(id.to_string(), key);
        true
    }

    /// 逐出单个节点
    pub fn evict(&mut self, original: &Handle) -> Option<RegistryEntry> {
        let key = NodeKey::of(original);
        let entry = self.entries.remove(&key)?;

        self.by_shadow.remove(&entry.shadow);
        if let Some(id) = &entry.id {
            if self.by_id.get(id) == Some(&key) {
                self.by_id.remove(id);
            }
        }
        Some(entry)
    }

    /// 逐出整棵子树中的所有条目，返回逐出数量
    pub fn evict_subtree(&mut self, root: &Handle) -> usize {
        let mut evicted = 0;
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            if self.evict(&node).is_some() {
                evicted += 1;
            }
            stack.extend(node.children.borrow().iter().cloned());
        }

        if evicted > 0 {
            tracing::debug!("已逐出 {} 个注册条目", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
