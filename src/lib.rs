//! # dom-splice
//!
//! 原位、保持结构的 HTML 树翻译引擎：找出可翻译区域，序列化为匿名、带序号标注的片段，
//! 交给外部翻译服务，再把译文按序号拼回原始树，不改变节点身份和非文本结构。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 解析、序列化与 DOM 操作，内联 `display` 解析
//! - `translation` - 切分、指纹、派发与合并
//! - `env` - 类型化的环境变量

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::*;
pub use translation::{TranslationConfig, TranslationEngine, TranslationError, TranslationResult};
