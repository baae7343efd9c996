// 集成测试公共模块
//
// 提供测试辅助工具和共享功能：片段解析、"中" 前缀模拟翻译器、会失败的翻译器

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use dom_splice::parsers::html::{
    find_nodes, fragment_root, html_fragment_to_dom, inner_html, text_content,
};
use dom_splice::translation::core::{AttachController, TagEligibility};
use dom_splice::translation::{
    CacheFirstTranslator, DefaultStyleOracle, TranslatedUnit, TranslationConfig,
    TranslationError, TranslationResult, Translator, Unit, UnitRegistry,
};

/// HTML 测试辅助
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 解析片段，返回 DOM（需保持存活）和容器元素
    pub fn fragment(html: &str) -> (RcDom, Handle) {
        let dom = html_fragment_to_dom(html);
        let root = fragment_root(&dom).expect("fragment has a root element");
        (dom, root)
    }

    /// 第一个指定标签的元素
    pub fn first(root: &Handle, tag: &str) -> Handle {
        find_nodes(root, tag)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no <{}> in fragment", tag))
    }

    pub fn inner(node: &Handle) -> String {
        inner_html(node)
    }
}

/// 不经过派发队列，直接挂载并收集单元
pub fn attach_all(root: &Handle, config: &TranslationConfig) -> (UnitRegistry, Vec<Unit>) {
    let controller = AttachController::new(
        Rc::new(DefaultStyleOracle),
        Box::new(TagEligibility::from_config(config)),
        config,
    );
    let mut registry = UnitRegistry::new();
    let mut units = Vec::new();
    controller
        .scan(&mut registry, root, &mut units)
        .expect("collecting into a Vec never fails");
    (registry, units)
}

/// 挂载单个节点（忽略资格判定）
pub fn attach_node(node: &Handle) -> (UnitRegistry, Vec<Unit>) {
    let config = TranslationConfig::default();
    let controller = AttachController::new(
        Rc::new(DefaultStyleOracle),
        Box::new(|_: &Handle| true),
        &config,
    );
    let mut registry = UnitRegistry::new();
    let mut units = Vec::new();
    controller
        .attach(&mut registry, node, &mut units)
        .expect("collecting into a Vec never fails");
    (registry, units)
}

/// 用于引擎测试的配置：很短的窗口
pub fn test_config() -> TranslationConfig {
    TranslationConfig {
        page_url: "https://example.com/page".to_string(),
        batch_window_ms: 5,
        ..TranslationConfig::default()
    }
}

/// 模拟翻译：没有子元素的元素整体加上 "中" 前缀，否则递归进入子元素
pub fn mock_translate(payload: &str) -> String {
    let (_dom, root) = HtmlTestHelper::fragment(payload);
    prefix_leaves(&root);
    inner_html(&root)
}

fn prefix_leaves(node: &Handle) {
    let element_children: Vec<Handle> = node
        .children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect();

    if element_children.is_empty() {
        let text = text_content(node);
        // 空元素（如 <br>）保持原样
        if text.is_empty() {
            return;
        }
        let replacement = Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from(format!("中{}", text))),
        });
        replacement.parent.set(Some(Rc::downgrade(node)));
        *node.children.borrow_mut() = vec![replacement];
    } else {
        for child in &element_children {
            prefix_leaves(child);
        }
    }
}

/// "中" 前缀模拟翻译器，记录收到的单元
#[derive(Default)]
pub struct MockTranslator {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Unit>>,
}

impl MockTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_units(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Translator for MockTranslator {
    fn translate_batch<'a>(
        &'a self,
        units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().extend(units.iter().cloned());
            Ok(units
                .iter()
                .map(|unit| TranslatedUnit::new(unit.id.clone(), mock_translate(&unit.payload)))
                .collect())
        }
        .boxed()
    }
}

/// 前 `failures` 次调用返回网络错误，之后退化为模拟翻译
pub struct FlakyTranslator {
    failures: usize,
    pub calls: AtomicUsize,
}

impl FlakyTranslator {
    pub fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Translator for FlakyTranslator {
    fn translate_batch<'a>(
        &'a self,
        units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
        async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(TranslationError::NetworkError(format!("connection reset #{}", call)));
            }
            Ok(units
                .iter()
                .map(|unit| TranslatedUnit::new(unit.id.clone(), mock_translate(&unit.payload)))
                .collect())
        }
        .boxed()
    }
}

/// 先查后建的内存存储：预置的译文直接命中，其余走模拟翻译
#[derive(Default)]
pub struct MemoryStore {
    pub known: Mutex<HashMap<String, String>>,
    pub created: AtomicUsize,
}

impl CacheFirstTranslator for MemoryStore {
    fn query<'a>(&'a self, unit: &'a Unit) -> BoxFuture<'a, TranslationResult<Option<TranslatedUnit>>> {
        async move {
            let known = self.known.lock().unwrap();
            Ok(known
                .get(&unit.payload)
                .map(|content| TranslatedUnit::new(unit.id.clone(), content.clone())))
        }
        .boxed()
    }

    fn create<'a>(&'a self, unit: &'a Unit) -> BoxFuture<'a, TranslationResult<TranslatedUnit>> {
        async move {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(TranslatedUnit::new(unit.id.clone(), mock_translate(&unit.payload)))
        }
        .boxed()
    }
}
