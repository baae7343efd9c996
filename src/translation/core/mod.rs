//! 翻译系统核心模块
//!
//! ## 模块依赖关系
//!
//! ```text
//! TranslationEngine (engine.rs)
//!     ├── AttachController (attach.rs)
//!     │       ├── ShadowBuilder (pipeline/shadow.rs)
//!     │       └── segment (pipeline/segmenter.rs)
//!     ├── DispatchQueue (dispatch.rs) ── Translator (provider.rs)
//!     ├── MergeEngine (merge.rs)
//!     └── UnitRegistry (storage/registry.rs)
//! ```
//!
//! 引擎在单一任务上协作式运行，活动树不需要加锁；
//! 派发队列的缓冲窗口和翻译服务调用是仅有的挂起点。

pub mod attach;
pub mod dispatch;
pub mod engine;
pub mod merge;

pub use attach::{AttachController, AttachOutcome, Eligibility, MutationRecord, TagEligibility, UnitSink};
pub use dispatch::{BatchFailure, DispatchConfig, DispatchHandle, DispatchOutcome, DispatchQueue};
pub use engine::{EngineReport, EngineStats, TranslationEngine};
pub use merge::{merge_node, MergeEngine, MergeOutcome};
