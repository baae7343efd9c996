//! 挂载控制
//!
//! 决定哪些节点需要翻译、保证每个节点最多处理一次，
//! 并对树的结构变更做出反应。节点的状态只有 `未见 → 已挂载` 两种，
//! "已挂载"即注册表中存在该节点。

use std::collections::HashSet;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{get_node_name, has_node_attr};
use crate::translation::config::TranslationConfig;
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::{segment, ShadowBuilder, Unit};
use crate::translation::storage::{NodeKey, UnitRegistry};
use crate::translation::style::{nearest_block_ancestor, StyleOracle};

/// 挂载资格判定
pub trait Eligibility {
    fn is_eligible(&self, node: &Handle) -> bool;
}

impl<F> Eligibility for F
where
    F: Fn(&Handle) -> bool,
{
    fn is_eligible(&self, node: &Handle) -> bool {
        self(node)
    }
}

/// 默认资格判定：标签白名单、专用翻译标签或显式开启属性
#[derive(Debug, Clone)]
pub struct TagEligibility {
    tags: HashSet<String>,
    translate_tag: String,
    opt_in_attr: String,
}

impl TagEligibility {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            tags: config
                .eligible_tags
                .iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
            translate_tag: config.translate_tag.to_ascii_lowercase(),
            opt_in_attr: config.opt_in_attr.clone(),
        }
    }
}

impl Eligibility for TagEligibility {
    fn is_eligible(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };
        self.tags.contains(name)
            || name == self.translate_tag
            || has_node_attr(node, &self.opt_in_attr)
    }
}

/// 单元的去向
pub trait UnitSink {
    fn push_unit(&mut self, unit: Unit) -> TranslationResult<()>;
}

impl UnitSink for Vec<Unit> {
    fn push_unit(&mut self, unit: Unit) -> TranslationResult<()> {
        self.push(unit);
        Ok(())
    }
}

/// 挂载结果；不合格和重复挂载都不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Ineligible,
    AlreadyAttached,
    Attached { units: usize },
}

/// 一次结构变更通知
#[derive(Debug, Clone, Default)]
pub struct MutationRecord {
    pub added: Vec<Handle>,
    pub removed: Vec<Handle>,
}

impl MutationRecord {
    pub fn added(nodes: Vec<Handle>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(nodes: Vec<Handle>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}

/// 挂载控制器
pub struct AttachController {
    oracle: Rc<dyn StyleOracle>,
    eligibility: Box<dyn Eligibility>,
    page_uri: String,
    skip_tags: Vec<String>,
}

impl AttachController {
    pub fn new(
        oracle: Rc<dyn StyleOracle>,
        eligibility: Box<dyn Eligibility>,
        config: &TranslationConfig,
    ) -> Self {
        Self {
            oracle,
            eligibility,
            page_uri: config.page_url.clone(),
            skip_tags: config.skip_tags.clone(),
        }
    }

    pub fn oracle(&self) -> &dyn StyleOracle {
        self.oracle.as_ref()
    }

    /// 挂载单个节点：构建影子树、切分并把单元交给 `sink`
    pub fn attach(
        &self,
        registry: &mut UnitRegistry,
        node: &Handle,
        sink: &mut dyn UnitSink,
    ) -> TranslationResult<AttachOutcome> {
        if !self.eligibility.is_eligible(node) {
            return Ok(AttachOutcome::Ineligible);
        }
        if registry.contains(node) {
            tracing::trace!("<{}> 已挂载", get_node_name(node).unwrap_or_default());
            return Ok(AttachOutcome::AlreadyAttached);
        }

        let shadow = ShadowBuilder::new(
            self.oracle.as_ref(),
            registry,
            &self.page_uri,
            &self.skip_tags,
        )
        .build(node);
        let Some(shadow) = shadow else {
            return Ok(AttachOutcome::Ineligible);
        };

        let units = segment(&shadow);
        let count = units.len();
        for unit in units {
            if let Some(owner) = unit.owner {
                registry.assign_id(owner, &unit.id);
            }
            sink.push_unit(unit)?;
        }

        tracing::debug!("挂载 <{}>，产生 {} 个单元", shadow.tag, count);
        Ok(AttachOutcome::Attached { units: count })
    }

    /// 深度优先扫描子树，挂载所有合格元素；不进入已覆盖的子树
    pub fn scan(
        &self,
        registry: &mut UnitRegistry,
        root: &Handle,
        sink: &mut dyn UnitSink,
    ) -> TranslationResult<usize> {
        let mut units = 0;
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            match &node.data {
                NodeData::Element { .. } => {
                    if registry.contains(&node) || self.is_skipped(&node) {
                        continue;
                    }
                    match self.attach(registry, &node, sink)? {
                        AttachOutcome::Attached { units: count } => {
                            units += count;
                            continue;
                        }
                        AttachOutcome::AlreadyAttached => continue,
                        AttachOutcome::Ineligible => {}
                    }
                }
                NodeData::Document => {}
                NodeData::Text { .. }
                | NodeData::Comment { .. }
                | NodeData::Doctype { .. }
                | NodeData::ProcessingInstruction { .. } => continue,
            }

            // 逆序入栈以保持文档顺序
            let children = node.children.borrow();
            stack.extend(children.iter().rev().cloned());
        }

        Ok(units)
    }

    /// 响应一次结构变更
    ///
    /// 被移除且未在同一通知中重新插入的子树从注册表逐出；
    /// 新插入的节点挂载其最近的块级祖先，并扫描插入的子树本身。
    /// 已挂载块内部的插入不会触发重新翻译。
    pub fn observe(
        &self,
        registry: &mut UnitRegistry,
        record: &MutationRecord,
        sink: &mut dyn UnitSink,
    ) -> TranslationResult<usize> {
        let re_added: HashSet<NodeKey> = record.added.iter().map(NodeKey::of).collect();
        for node in &record.removed {
            if !re_added.contains(&NodeKey::of(node)) {
                registry.evict_subtree(node);
            }
        }

        let mut units = 0;
        for node in &record.added {
            if let Some(block) = nearest_block_ancestor(self.oracle(), node) {
                if let AttachOutcome::Attached { units: count } =
                    self.attach(registry, &block, sink)?
                {
                    units += count;
                }
            }
            units += self.scan(registry, node, sink)?;
        }

        Ok(units)
    }

    fn is_skipped(&self, node: &Handle) -> bool {
        get_node_name(node)
            .map(|name| self.skip_tags.iter().any(|skip| skip.eq_ignore_ascii_case(name)))
            .unwrap_or(false)
    }
}
