//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。
//!
//! 注意：不可翻译的节点、重复挂载、找不到合并目标都不是错误，
//! 它们以 `AttachOutcome` / `MergeOutcome` 的形式返回。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 速率限制错误
    #[error("请求速率过快，已达到限制")]
    RateLimitExceeded,

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 翻译服务错误
    #[error("翻译服务错误: {0}")]
    TranslationServiceError(String),

    /// 批次在重试后仍然失败，已被丢弃
    #[error("批次 #{batch} 在 {attempts} 次尝试后被丢弃: {reason}")]
    BatchDropped {
        batch: u64,
        attempts: usize,
        reason: String,
    },

    /// 派发队列已关闭
    #[error("派发队列已关闭，无法提交单元")]
    QueueClosed,

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::TranslationServiceError(_) => true,
            TranslationError::RateLimitExceeded => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::BatchDropped { .. } => false,
            TranslationError::QueueClosed => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::RateLimitExceeded => ErrorSeverity::Warning,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::TranslationServiceError(_) => ErrorSeverity::Error,
            TranslationError::BatchDropped { .. } => ErrorSeverity::Error,
            TranslationError::QueueClosed => ErrorSeverity::Warning,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::RateLimitExceeded => ErrorCategory::RateLimit,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::TranslationServiceError(_) => ErrorCategory::Service,
            TranslationError::BatchDropped { .. } => ErrorCategory::Dispatch,
            TranslationError::QueueClosed => ErrorCategory::Dispatch,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        match &mut self {
            TranslationError::ConfigError(ref mut msg)
            | TranslationError::NetworkError(ref mut msg)
            | TranslationError::InvalidInput(ref mut msg)
            | TranslationError::TranslationServiceError(ref mut msg)
            | TranslationError::ParseError(ref mut msg)
            | TranslationError::SerializationError(ref mut msg)
            | TranslationError::InternalError(ref mut msg)
            | TranslationError::BatchDropped {
                reason: ref mut msg,
                ..
            } => *msg = format!("{} (上下文: {})", msg, context),
            TranslationError::RateLimitExceeded | TranslationError::QueueClosed => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    RateLimit,
    Input,
    Service,
    Dispatch,
    Parsing,
    Serialization,
    Internal,
}

/// 标准错误转换
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.status().map(|s| s.as_u16()) == Some(429) {
            TranslationError::RateLimitExceeded
        } else if error.is_decode() {
            TranslationError::SerializationError(format!("响应解码失败: {}", error))
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: TranslationError) -> TranslationResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建网络错误
    pub fn network_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::NetworkError(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InvalidInput(msg.to_string())
    }

    /// 创建翻译服务错误
    pub fn service_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::TranslationServiceError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_are_retryable() {
        assert!(TranslationError::NetworkError("reset".into()).is_retryable());
        assert!(TranslationError::TranslationServiceError("500".into()).is_retryable());
        assert!(!TranslationError::InvalidInput("bad".into()).is_retryable());
        assert!(!TranslationError::QueueClosed.is_retryable());
    }

    #[test]
    fn context_is_appended() {
        let error = helpers::network_error("timeout").with_context("batch #3");
        assert!(error.to_string().contains("batch #3"));
        assert_eq!(error.category(), ErrorCategory::Network);

        let dropped = TranslationError::BatchDropped {
            batch: 1,
            attempts: 2,
            reason: "boom".into(),
        }
        .with_context("shutdown");
        assert!(dropped.to_string().contains("shutdown"));
        assert_eq!(dropped.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn context_does_not_repeat_the_prefix() {
        let error = helpers::config_error("x").with_context("c");
        assert_eq!(error.to_string(), "配置错误: x (上下文: c)");

        let error = helpers::validation_error("bad").with_context("input");
        assert!(matches!(&error, TranslationError::InvalidInput(msg) if msg == "bad (上下文: input)"));
        assert_eq!(
            helpers::service_error("HTTP 500").to_string(),
            "翻译服务错误: HTTP 500"
        );
    }

    #[test]
    fn log_error_passes_error_through() {
        let result: TranslationResult<()> = helpers::log_error(helpers::config_error("x"));
        assert!(matches!(result, Err(TranslationError::ConfigError(_))));
    }
}
