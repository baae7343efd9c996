//! 样式判定
//!
//! 引擎只消费"块级还是行内"这一个结论，判定本身交给 [`StyleOracle`]。
//! 默认实现 [`DefaultStyleOracle`] 读取内联 `display` 声明，
//! 否则退回到按标签名的用户代理默认值。

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};

use crate::parsers::css::{parse_display, DisplayKeyword};
use crate::parsers::html::{get_node_attr, get_node_name, get_parent_node, node_kind, NodeKind};

/// 用户代理样式表中默认为块级的元素
///
/// `display: none` 的文档级元素（`head`、`title`）也列在这里，
/// 它们同样不会被吸收进周围的句子。
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "center", "dd", "details",
    "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "legend",
    "li", "listing", "main", "menu", "nav", "ol", "optgroup", "p", "plaintext", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "ul",
    "xmp",
];

/// 块级 / 行内分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockClass {
    Block,
    Inline,
}

impl BlockClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockClass::Block => "block",
            BlockClass::Inline => "inline",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, BlockClass::Block)
    }
}

impl From<DisplayKeyword> for BlockClass {
    fn from(keyword: DisplayKeyword) -> Self {
        match keyword {
            DisplayKeyword::Block => BlockClass::Block,
            DisplayKeyword::Inline => BlockClass::Inline,
        }
    }
}

/// 样式判定器
///
/// 返回 `None` 表示无法判定（例如节点不是元素），调用方按块级处理。
pub trait StyleOracle {
    fn classify(&self, node: &Handle) -> Option<BlockClass>;
}

impl<F> StyleOracle for F
where
    F: Fn(&Handle) -> Option<BlockClass>,
{
    fn classify(&self, node: &Handle) -> Option<BlockClass> {
        self(node)
    }
}

/// 默认样式判定器：内联 `display` 优先，其次按标签名
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStyleOracle;

impl StyleOracle for DefaultStyleOracle {
    fn classify(&self, node: &Handle) -> Option<BlockClass> {
        let name = get_node_name(node)?;

        if let Some(style) = get_node_attr(node, "style") {
            match parse_display(&style) {
                Ok(Some(keyword)) => return Some(keyword.into()),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("无法解析 <{}> 的 display 声明: {:?}", name, e.style);
                    return None;
                }
            }
        }

        if BLOCK_TAGS.contains(&name) {
            Some(BlockClass::Block)
        } else {
            Some(BlockClass::Inline)
        }
    }
}

/// 判定失败时按块级处理
pub fn classify_or_block(oracle: &dyn StyleOracle, node: &Handle) -> BlockClass {
    oracle.classify(node).unwrap_or(BlockClass::Block)
}

/// 从节点自身开始向上查找最近的块级元素
///
/// 文本等非元素节点从其父元素开始判定。
pub fn nearest_block_ancestor(oracle: &dyn StyleOracle, node: &Handle) -> Option<Handle> {
    let mut current = Some(node.clone());

    while let Some(candidate) = current {
        if node_kind(&candidate) == NodeKind::Element
            && classify_or_block(oracle, &candidate).is_block()
        {
            return Some(candidate);
        }
        current = get_parent_node(&candidate);
    }

    None
}
