//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、父子关系、文本读写）
//! - `serializer`: 序列化功能（文档输出、inner/outer HTML）

pub mod dom;
pub mod serializer;

// 重新导出主要的公共 API
pub use dom::{
    append_child, detach_node, element_index_in_parent, find_nodes, fragment_root, get_charset,
    get_node_attr, get_node_name, get_parent_node, has_node_attr, html_fragment_to_dom,
    html_to_dom, index_in_parent, insert_child, node_kind, set_text, text_content, NodeKind,
};
pub use serializer::{inner_html, render, serialize_document};
