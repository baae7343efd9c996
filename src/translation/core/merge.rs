//! 译文合并
//!
//! 按指纹找到原始节点后，同步遍历译文片段和原始节点：
//! 子元素用携带的原始序号定位，而不是用译文中的顺序，
//! 因此服务端调换了子元素顺序也能正确落位。原始树中的注释等不透明节点从不改动。

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{
    fragment_root, get_node_attr, get_node_name, has_node_attr, html_fragment_to_dom, set_text,
    text_content,
};
use crate::translation::config::constants::{INDEX_ATTR, SKIP_ATTR, TEXT_WRAPPER_ATTR};
use crate::translation::provider::TranslatedUnit;
use crate::translation::storage::UnitRegistry;

/// 合并结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// 写入了若干文本节点
    Merged { texts: usize },
    /// 指纹不在注册表中（节点已被移除），结果被丢弃
    UnknownId,
}

/// 合并引擎
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        Self
    }

    /// 把一条翻译结果写回原始树
    pub fn merge(&self, registry: &UnitRegistry, result: &TranslatedUnit) -> MergeOutcome {
        let Some(entry) = registry.find_by_id(&result.id) else {
            tracing::warn!("未找到指纹 {} 对应的节点，丢弃结果", result.id);
            return MergeOutcome::UnknownId;
        };

        let dom = html_fragment_to_dom(&result.content);
        let Some(translated) = fragment_root(&dom) else {
            return MergeOutcome::Merged { texts: 0 };
        };

        let texts = merge_node(&entry.original, &translated);
        tracing::debug!("合并 {}: 写入 {} 个文本节点", result.id, texts);
        MergeOutcome::Merged { texts }
    }
}

/// 递归合并，返回写入的文本节点数量
///
/// `translated` 的子节点按以下规则处理：
///
/// - 未标注的文本：原节点只有一个裸文本时由它承载（包裹只在有兄弟时发生）
/// - 文本包裹元素：整体文本写入原序号处的文本节点
/// - 带序号的元素：与原序号处的元素递归合并
/// - 跳过占位、无序号元素和不透明节点：忽略
pub fn merge_node(original: &Handle, translated: &Handle) -> usize {
    let mut written = 0;
    let mut loose_text = String::new();

    for child in translated.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => loose_text.push_str(&contents.borrow()),
            NodeData::Element { .. } => {
                if has_node_attr(child, SKIP_ATTR) {
                    continue;
                }
                let Some(index) = original_index(child) else {
                    tracing::trace!(
                        "忽略无序号元素 <{}>",
                        get_node_name(child).unwrap_or_default()
                    );
                    continue;
                };
                let Some(target) = original.children.borrow().get(index).cloned() else {
                    tracing::debug!("原始子节点 #{} 已不存在，跳过", index);
                    continue;
                };

                if has_node_attr(child, TEXT_WRAPPER_ATTR) {
                    if matches!(target.data, NodeData::Text { .. }) {
                        written += usize::from(splice_text(&target, &text_content(child)));
                    }
                } else if matches!(target.data, NodeData::Element { .. }) {
                    written += merge_node(&target, child);
                }
            }
            NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. }
            | NodeData::Doctype { .. }
            | NodeData::Document => {}
        }
    }

    if !loose_text.trim().is_empty() {
        if let Some(target) = sole_text_child(original) {
            written += usize::from(splice_text(&target, &loose_text));
        }
    }

    written
}

fn original_index(node: &Handle) -> Option<usize> {
    get_node_attr(node, INDEX_ATTR)?.trim().parse().ok()
}

/// 原节点中唯一的非空文本子节点；没有非空文本时取第一个文本子节点
fn sole_text_child(original: &Handle) -> Option<Handle> {
    let children = original.children.borrow();
    let mut texts = children
        .iter()
        .filter(|child| matches!(child.data, NodeData::Text { .. }));

    let non_blank: Vec<&Handle> = texts
        .clone()
        .filter(|child| !text_content(child).trim().is_empty())
        .collect();

    let target = match non_blank.as_slice() {
        [only] => Some((*only).clone()),
        [] => texts.next().cloned(),
        _ => None,
    };
    target
}

/// 写入译文，保留原文本首尾的空白
fn splice_text(target: &Handle, translated: &str) -> bool {
    let original = text_content(target);
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];

    // 全空白的原文本没有可区分的首尾
    let replacement = if original.trim().is_empty() {
        translated.to_string()
    } else {
        format!("{}{}{}", leading, translated.trim(), trailing)
    };
    set_text(target, &replacement)
}
