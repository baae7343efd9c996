//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译引擎配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub page_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub api_url: String,

    // 派发配置
    pub batch_window_ms: u64,
    pub max_batch_units: usize,
    pub max_retry_attempts: usize,
    pub request_timeout_secs: u64,

    // 挂载判定
    pub eligible_tags: Vec<String>,
    pub translate_tag: String,
    pub opt_in_attr: String,
    pub skip_tags: Vec<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            page_url: constants::DEFAULT_PAGE_URL.to_string(),
            source_lang: "auto".to_string(),
            target_lang: "zh".to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),

            batch_window_ms: constants::DEFAULT_BATCH_WINDOW_MS,
            max_batch_units: constants::DEFAULT_MAX_BATCH_UNITS,
            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,

            eligible_tags: to_owned_list(constants::DEFAULT_ELIGIBLE_TAGS),
            translate_tag: constants::DEFAULT_TRANSLATE_TAG.to_string(),
            opt_in_attr: constants::DEFAULT_OPT_IN_ATTR.to_string(),
            skip_tags: to_owned_list(constants::DEFAULT_SKIP_TAGS),
        }
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TranslationConfig {
    /// 创建带指定语言的默认配置
    pub fn default_with_lang(target_lang: &str, api_url: Option<&str>) -> Self {
        let mut config = Self::default();
        config.target_lang = target_lang.to_string();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_units == 0 {
            return Err(TranslationError::ConfigError("批次单元数不能为0".to_string()));
        }

        if self.max_retry_attempts > 1 {
            return Err(TranslationError::ConfigError(format!(
                "重试次数只能为0或1，当前为 {}",
                self.max_retry_attempts
            )));
        }

        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.translate_tag.trim().is_empty() || self.opt_in_attr.trim().is_empty() {
            return Err(TranslationError::ConfigError(
                "翻译标签和显式开启属性不能为空".to_string(),
            ));
        }

        Url::parse(&self.page_url)
            .map_err(|e| TranslationError::ConfigError(format!("页面地址无效 '{}': {}", self.page_url, e)))?;

        let api_url = Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API地址无效 '{}': {}", self.api_url, e)))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(TranslationError::ConfigError(
                "API地址必须使用 http 或 https".to_string(),
            ));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{translation, EnvVar};

        if let Ok(page_url) = translation::PageUrl::get() {
            self.page_url = page_url;
        }

        if let Ok(target_lang) = translation::TargetLang::get() {
            self.target_lang = target_lang;
        }

        if let Ok(source_lang) = translation::SourceLang::get() {
            self.source_lang = source_lang;
        }

        if let Ok(api_url) = translation::ApiUrl::get() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if let Ok(window) = translation::BatchWindow::get() {
            self.batch_window_ms = window.as_millis() as u64;
        }

        if let Ok(units) = translation::MaxBatchUnits::get() {
            self.max_batch_units = units;
        }

        if let Ok(attempts) = translation::MaxRetryAttempts::get() {
            self.max_retry_attempts = attempts;
        }

        if let Ok(timeout) = translation::RequestTimeout::get() {
            self.request_timeout_secs = timeout.as_secs();
        }
    }

    /// 防抖窗口
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器：配置文件 → 环境变量覆盖 → 校验
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 覆盖语言和API地址后返回配置副本
    pub fn create_simple_config(&self, target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
        let mut config = self.config.clone();
        config.target_lang = target_lang.to_string();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败 {}: {}", path, e)))?;

        Self::parse_config(path, &content)
    }

    /// 按扩展名解析配置内容，`.json` 之外一律按 TOML 处理
    pub fn parse_config(path: &str, content: &str) -> TranslationResult<TranslationConfig> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TranslationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_window(), Duration::from_millis(30));
        assert!(config.eligible_tags.iter().any(|t| t == "p"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ConfigManager::parse_config(
            "dom-splice.toml",
            "page_url = \"https://example.com/a\"\nmax_batch_units = 8\n",
        )
        .unwrap();
        assert_eq!(config.page_url, "https://example.com/a");
        assert_eq!(config.max_batch_units, 8);
        assert_eq!(config.translate_tag, constants::DEFAULT_TRANSLATE_TAG);
    }

    #[test]
    fn json_is_parsed_by_extension() {
        let config =
            ConfigManager::parse_config("cfg.json", r#"{"target_lang": "ja", "skip_tags": []}"#).unwrap();
        assert_eq!(config.target_lang, "ja");
        assert!(config.skip_tags.is_empty());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = TranslationConfig::default();
        config.max_batch_units = 0;
        assert!(config.validate().is_err());

        let mut config = TranslationConfig::default();
        config.api_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = TranslationConfig::default();
        config.page_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_attempts_above_one_are_rejected() {
        let config = ConfigManager::parse_config("dom-splice.toml", "max_retry_attempts = 3").unwrap();
        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));

        let config = ConfigManager::parse_config("dom-splice.toml", "max_retry_attempts = 0").unwrap();
        assert!(config.validate().is_ok());
    }
}
