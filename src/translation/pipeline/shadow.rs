//! 影子树构建
//!
//! 把一棵活动子树克隆为匿名化、带标注的影子树：
//!
//! - 元素记录在原父节点子列表中的位置和块级/行内分类，丢弃原有属性
//! - 有兄弟的裸文本被包进合成的行内 `span`
//! - 注释等不透明节点原样保留，不加标注
//! - 跳过名单中的元素只留下空的占位
//!
//! 分类在同一遍遍历中完成。块级元素和包含块级后代的元素会登记到注册表，
//! 并各自计算一次指纹。

use std::io;

use html5ever::serialize::{Serialize, Serializer, TraversalScope};
use html5ever::{namespace_url, ns, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData};

use super::fingerprint::{fingerprint, locate, Locator};
use crate::parsers::html::{get_node_name, inner_html, render};
use crate::translation::config::constants::{
    DISPLAY_ATTR, INDEX_ATTR, SKIP_ATTR, TEXT_WRAPPER_ATTR, TEXT_WRAPPER_TAG,
};
use crate::translation::storage::{ShadowId, UnitRegistry};
use crate::translation::style::{classify_or_block, BlockClass, StyleOracle};

/// 登记节点的指纹信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub fingerprint: String,
    pub locator: Locator,
}

/// 不透明节点的副本
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opaque {
    Comment(String),
    ProcessingInstruction { target: String, contents: String },
    Doctype(String),
}

/// 影子节点
#[derive(Debug, Clone)]
pub enum ShadowNode {
    Element(ShadowElement),
    Text(String),
    Opaque(Opaque),
}

/// 影子元素
#[derive(Debug, Clone)]
pub struct ShadowElement {
    pub tag: String,
    /// 在原父节点子列表中的位置，只有根为 `None`
    pub original_index: Option<usize>,
    pub block_class: BlockClass,
    pub is_text_wrapper: bool,
    pub contains_block: bool,
    pub skipped: bool,
    /// 先前的挂载已经登记过的边界，本次不再展开
    pub previously_attached: bool,
    pub id: ShadowId,
    pub block: Option<BlockInfo>,
    pub children: Vec<ShadowNode>,
}

impl ShadowElement {
    /// 是否打断句子累积
    pub fn breaks_sentence(&self) -> bool {
        self.previously_attached
            || (!self.is_text_wrapper && (self.block_class.is_block() || self.contains_block))
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            child.collect_text(&mut text);
        }
        text
    }

    /// 子节点的标注序列化
    pub fn inner_html(&self) -> String {
        render(self, TraversalScope::ChildrenOnly(None))
    }

    pub fn outer_html(&self) -> String {
        render(self, TraversalScope::IncludeNode)
    }

    fn qual_name(&self) -> QualName {
        QualName::new(None, ns!(html), LocalName::from(self.tag.as_str()))
    }

    fn annotations(&self) -> Vec<(QualName, String)> {
        let mut attrs = Vec::with_capacity(3);
        if let Some(index) = self.original_index {
            attrs.push((attr_name(INDEX_ATTR), index.to_string()));
            attrs.push((attr_name(DISPLAY_ATTR), self.block_class.as_str().to_string()));
        }
        if self.is_text_wrapper {
            attrs.push((attr_name(TEXT_WRAPPER_ATTR), String::new()));
        }
        if self.skipped {
            attrs.push((attr_name(SKIP_ATTR), String::new()));
        }
        attrs
    }
}

impl ShadowNode {
    pub fn as_element(&self) -> Option<&ShadowElement> {
        match self {
            ShadowNode::Element(element) => Some(element),
            ShadowNode::Text(_) | ShadowNode::Opaque(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    pub fn outer_html(&self) -> String {
        render(self, TraversalScope::IncludeNode)
    }

    fn collect_text(&self, text: &mut String) {
        match self {
            ShadowNode::Text(contents) => text.push_str(contents),
            ShadowNode::Element(element) => {
                for child in &element.children {
                    child.collect_text(text);
                }
            }
            ShadowNode::Opaque(_) => {}
        }
    }
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}

impl Serialize for ShadowElement {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let include_self = matches!(traversal_scope, TraversalScope::IncludeNode);

        if include_self {
            let attrs = self.annotations();
            serializer.start_elem(
                self.qual_name(),
                attrs.iter().map(|(name, value)| (name, value.as_str())),
            )?;
        }

        for child in &self.children {
            child.serialize(serializer, TraversalScope::IncludeNode)?;
        }

        if include_self {
            serializer.end_elem(self.qual_name())?;
        }
        Ok(())
    }
}

impl Serialize for ShadowNode {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match self {
            ShadowNode::Element(element) => element.serialize(serializer, traversal_scope),
            ShadowNode::Text(_) | ShadowNode::Opaque(_)
                if matches!(traversal_scope, TraversalScope::ChildrenOnly(_)) =>
            {
                Ok(())
            }
            ShadowNode::Text(contents) => serializer.write_text(contents),
            ShadowNode::Opaque(Opaque::Comment(contents)) => serializer.write_comment(contents),
            ShadowNode::Opaque(Opaque::ProcessingInstruction { target, contents }) => {
                serializer.write_processing_instruction(target, contents)
            }
            ShadowNode::Opaque(Opaque::Doctype(name)) => serializer.write_doctype(name),
        }
    }
}

/// 影子树构建器
///
/// 借用引擎的注册表完成登记；同一输入树多次构建得到结构相同的影子树，
/// 只有 [`ShadowId`] 每次重新分配（它不参与指纹计算）。
pub struct ShadowBuilder<'a> {
    oracle: &'a dyn StyleOracle,
    registry: &'a mut UnitRegistry,
    page_uri: &'a str,
    skip_tags: &'a [String],
}

impl<'a> ShadowBuilder<'a> {
    pub fn new(
        oracle: &'a dyn StyleOracle,
        registry: &'a mut UnitRegistry,
        page_uri: &'a str,
        skip_tags: &'a [String],
    ) -> Self {
        Self {
            oracle,
            registry,
            page_uri,
            skip_tags,
        }
    }

    /// 构建以 `root` 为根的影子树；根不是元素时返回 `None`
    ///
    /// 根总是被登记，即使它本身是行内元素。
    pub fn build(&mut self, root: &Handle) -> Option<ShadowElement> {
        get_node_name(root)?;
        Some(self.build_element(root, None))
    }

    fn build_element(&mut self, node: &Handle, original_index: Option<usize>) -> ShadowElement {
        let tag = get_node_name(node).unwrap_or_default().to_ascii_lowercase();
        let block_class = classify_or_block(self.oracle, node);
        let id = self.registry.next_shadow_id();
        let skipped = self.skip_tags.iter().any(|skip| skip.eq_ignore_ascii_case(&tag));
        let is_root = original_index.is_none();

        // 已登记的后代保留原有条目，不覆盖影子标记
        if !is_root && self.registry.contains(node) {
            tracing::trace!("<{}> 已由先前的挂载登记", tag);
            return ShadowElement {
                tag,
                original_index,
                block_class,
                is_text_wrapper: false,
                contains_block: false,
                skipped,
                previously_attached: true,
                id,
                block: None,
                children: Vec::new(),
            };
        }

        let children = if skipped {
            Vec::new()
        } else {
            self.build_children(node)
        };

        let contains_block = children.iter().any(|child| match child {
            ShadowNode::Element(element) => element.breaks_sentence(),
            ShadowNode::Text(_) | ShadowNode::Opaque(_) => false,
        });

        let block = if !skipped && (is_root || block_class.is_block() || contains_block) {
            self.registry.add(node, id);
            let locator = locate(self.page_uri, node);
            let fingerprint = fingerprint(&inner_html(node), &locator);
            tracing::trace!("登记边界 <{}> {} -> {}", tag, locator, fingerprint);
            Some(BlockInfo {
                fingerprint,
                locator,
            })
        } else {
            None
        };

        ShadowElement {
            tag,
            original_index,
            block_class,
            is_text_wrapper: false,
            contains_block,
            skipped,
            previously_attached: false,
            id,
            block,
            children,
        }
    }

    fn build_children(&mut self, node: &Handle) -> Vec<ShadowNode> {
        let children = node.children.borrow();
        let mut shadows = Vec::with_capacity(children.len());

        for (index, child) in children.iter().enumerate() {
            let shadow = match &child.data {
                NodeData::Element { .. } => {
                    ShadowNode::Element(self.build_element(child, Some(index)))
                }
                NodeData::Text { contents } => {
                    let text = contents.borrow().to_string();
                    if !text.trim().is_empty() && has_content_sibling(&children, index) {
                        ShadowNode::Element(self.wrap_text(text, index))
                    } else {
                        ShadowNode::Text(text)
                    }
                }
                NodeData::Comment { contents } => {
                    ShadowNode::Opaque(Opaque::Comment(contents.to_string()))
                }
                NodeData::ProcessingInstruction { target, contents } => {
                    ShadowNode::Opaque(Opaque::ProcessingInstruction {
                        target: target.to_string(),
                        contents: contents.to_string(),
                    })
                }
                NodeData::Doctype { name, .. } => {
                    ShadowNode::Opaque(Opaque::Doctype(name.to_string()))
                }
                NodeData::Document => continue,
            };
            shadows.push(shadow);
        }

        shadows
    }

    fn wrap_text(&mut self, text: String, index: usize) -> ShadowElement {
        ShadowElement {
            tag: TEXT_WRAPPER_TAG.to_string(),
            original_index: Some(index),
            block_class: BlockClass::Inline,
            is_text_wrapper: true,
            contains_block: false,
            skipped: false,
            previously_attached: false,
            id: self.registry.next_shadow_id(),
            block: None,
            children: vec![ShadowNode::Text(text)],
        }
    }
}

/// 是否存在元素兄弟或非空文本兄弟
fn has_content_sibling(siblings: &[Handle], index: usize) -> bool {
    siblings.iter().enumerate().any(|(i, sibling)| {
        i != index
            && match &sibling.data {
                NodeData::Element { .. } => true,
                NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
                _ => false,
            }
    })
}
