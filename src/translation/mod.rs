//! 翻译模块
//!
//! 对活动 DOM 树做原位、保持结构的翻译：
//! - **style**: 块级 / 行内判定
//! - **pipeline**: 影子树构建、句子切分、定位符与指纹
//! - **storage**: 单元注册表
//! - **core**: 挂载控制、派发队列、合并引擎和引擎门面
//! - **provider**: 翻译服务协作方
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dom_splice::parsers::html::html_to_dom;
//! use dom_splice::translation::{load_translation_config, HttpTranslator, TranslationEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_translation_config("zh", None);
//! let translator = Arc::new(HttpTranslator::new(&config)?);
//! let dom = html_to_dom(b"<h1>Hello</h1>", "utf-8".to_string());
//!
//! let mut engine = TranslationEngine::new(translator, config);
//! let report = engine.translate_document(&dom.document).await?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
///
/// 配置文件、环境变量覆盖和默认值
pub mod config;

/// 核心模块：挂载、派发、合并和引擎
pub mod core;

/// 错误处理模块
pub mod error;

/// 处理管道：影子树与切分
pub mod pipeline;

/// 翻译服务协作方
pub mod provider;

/// 注册表存储
pub mod storage;

/// 样式判定
pub mod style;

// ============================================================================
// 核心API导出
// ============================================================================

pub use self::core::{
    AttachOutcome, BatchFailure, EngineReport, EngineStats, MergeOutcome, MutationRecord,
    TranslationEngine,
};

pub use config::{constants, load_translation_config, ConfigManager, TranslationConfig};

pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

pub use pipeline::{Locator, Unit};

pub use provider::{CacheFirstTranslator, QueryOrCreate, TranslatedUnit, Translator};

#[cfg(feature = "http")]
pub use provider::HttpTranslator;

pub use storage::UnitRegistry;

pub use style::{BlockClass, DefaultStyleOracle, StyleOracle};
