//! 处理管道
//!
//! 影子树构建 → 句子切分，外加两者共用的定位符与指纹计算。

pub mod fingerprint;
pub mod segmenter;
pub mod shadow;

pub use fingerprint::{fingerprint, locate, Locator};
pub use segmenter::{segment, Unit};
pub use shadow::{BlockInfo, Opaque, ShadowBuilder, ShadowElement, ShadowNode};
