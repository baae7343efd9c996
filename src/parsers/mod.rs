//! # 解析器模块
//!
//! - `html` - HTML文档与片段解析、DOM操作、序列化
//! - `css` - 内联样式中 `display` 声明的解析

pub mod css;
pub mod html;

// Re-export commonly used items for convenience
pub use css::{parse_display, DisplayKeyword};
pub use html::{html_fragment_to_dom, html_to_dom, serialize_document};
