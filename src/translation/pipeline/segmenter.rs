//! 句子切分
//!
//! 从左到右遍历登记边界的子节点，把连续的行内节点累积为一个"句子"。
//! 遇到打断句子的子元素时先输出当前句子，再递归进入该子元素（跳过的元素和
//! 先前已挂载的边界不递归），然后开始新的句子。每个单元继承所属边界的指纹，而不是自身内容的指纹。

use html5ever::serialize::TraversalScope;
use serde::{Deserialize, Serialize};

use super::fingerprint::Locator;
use super::shadow::{BlockInfo, ShadowElement, ShadowNode};
use crate::parsers::html::render;
use crate::translation::storage::ShadowId;

/// 一个可独立翻译的单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// 所属边界的指纹
    pub id: String,
    pub locator: Locator,
    /// 匿名化、带序号标注的片段
    pub payload: String,
    /// 所属边界的影子标记，只在引擎内部使用
    #[serde(skip)]
    pub owner: Option<ShadowId>,
}

/// 把影子树切分为单元，按文档顺序返回
pub fn segment(shadow: &ShadowElement) -> Vec<Unit> {
    let mut units = Vec::new();
    collect_units(shadow, &mut units);
    units
}

fn collect_units(owner: &ShadowElement, units: &mut Vec<Unit>) {
    let Some(info) = owner.block.as_ref() else {
        tracing::debug!("<{}> 未登记，跳过切分", owner.tag);
        return;
    };

    let mut sentence: Vec<&ShadowNode> = Vec::new();

    for child in &owner.children {
        match child {
            ShadowNode::Element(element) if element.breaks_sentence() => {
                flush(owner, info, &mut sentence, units);
                if !element.skipped && !element.previously_attached {
                    collect_units(element, units);
                }
            }
            ShadowNode::Element(_) | ShadowNode::Text(_) | ShadowNode::Opaque(_) => {
                sentence.push(child)
            }
        }
    }

    flush(owner, info, &mut sentence, units);
}

fn flush(
    owner: &ShadowElement,
    info: &BlockInfo,
    sentence: &mut Vec<&ShadowNode>,
    units: &mut Vec<Unit>,
) {
    if sentence.is_empty() {
        return;
    }

    let text: String = sentence.iter().map(|node| node.text_content()).collect();
    let payload: String = sentence
        .iter()
        .map(|node| render(*node, TraversalScope::IncludeNode))
        .collect();
    sentence.clear();

    // 只有标记或空白的句子不值得发送
    let payload = payload.trim();
    if payload.is_empty() || text.trim().is_empty() {
        return;
    }

    units.push(Unit {
        id: info.fingerprint.clone(),
        locator: info.locator.clone(),
        payload: payload.to_string(),
        owner: Some(owner.id),
    });
}
