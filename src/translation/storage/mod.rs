//! 存储层
//!
//! 引擎唯一的状态是内存中的单元注册表，不做任何持久化。

pub mod registry;

pub use registry::{NodeKey, RegistryEntry, ShadowId, UnitRegistry};
