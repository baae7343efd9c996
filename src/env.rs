//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。翻译相关变量没有默认值：
//! 未设置时 `get()` 返回错误，调用方据此保留配置文件中的取值。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "DOM_SPLICE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 页面地址，用作单元定位符的前缀
    pub struct PageUrl;
    impl EnvVar<String> for PageUrl {
        const NAME: &'static str = "DOM_SPLICE_PAGE_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Address of the page being translated";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Page URL cannot be empty".to_string(),
                });
            }
            Ok(url.to_string())
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "DOM_SPLICE_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language for translation (ISO 639-1 code)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang.len() != 2 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 2 characters (ISO 639-1)".to_string(),
                });
            }
            Ok(lang)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "DOM_SPLICE_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language for translation ('auto' for provider-side detection)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang == "auto" || lang.len() == 2 {
                Ok(lang)
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 'auto' or 2 characters (ISO 639-1)".to_string(),
                })
            }
        }
    }

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "DOM_SPLICE_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation API endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 防抖窗口（毫秒）
    pub struct BatchWindow;
    impl EnvVar<Duration> for BatchWindow {
        const NAME: &'static str = "DOM_SPLICE_BATCH_WINDOW_MS";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Debounce window before a batch is flushed, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_usize_in_range(value, Self::NAME, 0, 5000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 单个批次的最大单元数
    pub struct MaxBatchUnits;
    impl EnvVar<usize> for MaxBatchUnits {
        const NAME: &'static str = "DOM_SPLICE_MAX_BATCH_UNITS";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Maximum units per provider batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_usize_in_range(value, Self::NAME, 1, 10000)
        }
    }

    /// 失败批次的重试次数
    pub struct MaxRetryAttempts;
    impl EnvVar<usize> for MaxRetryAttempts {
        const NAME: &'static str = "DOM_SPLICE_MAX_RETRY_ATTEMPTS";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Retries for a failed provider batch before it is dropped";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_usize_in_range(value, Self::NAME, 0, 1)
        }
    }

    /// HTTP 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "DOM_SPLICE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "HTTP provider request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_usize_in_range(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

fn parse_usize_in_range(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid non-negative number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 生成环境变量文档
pub fn generate_env_docs() -> String {
    let rows: &[(&str, &str)] = &[
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (translation::PageUrl::NAME, translation::PageUrl::DESCRIPTION),
        (translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION),
        (translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION),
        (translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION),
        (translation::BatchWindow::NAME, translation::BatchWindow::DESCRIPTION),
        (translation::MaxBatchUnits::NAME, translation::MaxBatchUnits::DESCRIPTION),
        (translation::MaxRetryAttempts::NAME, translation::MaxRetryAttempts::DESCRIPTION),
        (translation::RequestTimeout::NAME, translation::RequestTimeout::DESCRIPTION),
    ];

    let mut docs = String::from("| Variable | Description |\n|---|---|\n");
    for (name, description) in rows {
        docs.push_str(&format!("| `{}` | {} |\n", name, description));
    }
    docs
}
