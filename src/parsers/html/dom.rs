use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{local_name, namespace_url, ns, parse_document, parse_fragment, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 节点种类视图
///
/// 把 `NodeData` 的六种变体收敛为翻译引擎关心的三类，便于穷尽匹配。
/// 注释、处理指令、文档类型以及文档节点本身都属于不透明节点。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Opaque,
}

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: String) -> RcDom {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default()).one(s)
}

/// 以 `<body>` 为上下文解析 HTML 片段
///
/// 返回的 DOM 中 `document` 下只有一个合成的 `html` 元素，
/// 片段的顶层节点都是它的子节点，见 [`fragment_root`]。
pub fn html_fragment_to_dom(html: &str) -> RcDom {
    parse_fragment(
        RcDom::default(),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .one(html)
}

/// 获取片段 DOM 的容器元素
pub fn fragment_root(dom: &RcDom) -> Option<Handle> {
    dom.document
        .children
        .borrow()
        .iter()
        .find(|child| node_kind(child) == NodeKind::Element)
        .cloned()
}

/// 获取节点种类
pub fn node_kind(node: &Handle) -> NodeKind {
    match node.data {
        NodeData::Element { .. } => NodeKind::Element,
        NodeData::Text { .. } => NodeKind::Text,
        NodeData::Document
        | NodeData::Doctype { .. }
        | NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. } => NodeKind::Opaque,
    }
}

/// 查找指定名称的所有元素（深度优先，文档顺序）
pub fn find_nodes(node: &Handle, node_name: &str) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    if get_node_name(node) == Some(node_name) {
        found_nodes.push(node.clone());
    }

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, node_name));
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 检查元素是否带有指定属性
pub fn has_node_attr(node: &Handle, attr_name: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|attr| &*attr.name.local == attr_name),
        _ => false,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// rcdom 把父指针存放在 `Cell<Option<Weak>>` 中，读取时必须取出再放回，
/// 否则节点会丢失父链接。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 在父节点的子列表中定位节点
pub fn index_in_parent(child: &Handle) -> Option<usize> {
    let parent = get_parent_node(child)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .position(|sibling| Rc::ptr_eq(sibling, child));
    index
}

/// 在同级元素（不计文本和注释）中的位置
pub fn element_index_in_parent(child: &Handle) -> Option<usize> {
    let parent = get_parent_node(child)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .filter(|sibling| node_kind(sibling) == NodeKind::Element)
        .position(|sibling| Rc::ptr_eq(sibling, child));
    index
}

/// 追加子节点并维护父指针
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 在指定位置插入子节点，越界时追加到末尾
pub fn insert_child(parent: &Handle, index: usize, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child);
}

/// 从父节点上摘除节点
pub fn detach_node(node: &Handle) -> bool {
    let Some(parent) = get_parent_node(node) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    let before = children.len();
    children.retain(|child| !Rc::ptr_eq(child, node));
    node.parent.set(None);
    children.len() != before
}

/// 收集节点下全部文本
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        text.push_str(&contents.borrow());
        return;
    }
    for child in node.children.borrow().iter() {
        collect_text(child, text);
    }
}

/// 覆盖文本节点内容，非文本节点返回 `false`
pub fn set_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            *contents.borrow_mut() = StrTendril::from(text);
            true
        }
        _ => false,
    }
}

/// 从 `<meta>` 中读取文档字符集
///
/// 同时支持 `<meta charset>` 和 `<meta http-equiv="content-type">` 两种写法。
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta in find_nodes(node, "meta").iter() {
        if let Some(charset) = get_node_attr(meta, "charset") {
            return Some(charset.trim().to_string());
        }

        if get_node_attr(meta, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            let content = get_node_attr(meta, "content").unwrap_or_default();
            let charset = content.split(';').find_map(|param| {
                let (key, value) = param.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            });
            if charset.is_some() {
                return charset;
            }
        }
    }

    None
}
