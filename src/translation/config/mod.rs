//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 派发队列相关
    pub const DEFAULT_BATCH_WINDOW_MS: u64 = 30;
    pub const DEFAULT_MAX_BATCH_UNITS: usize = 100;
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 1;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_PAGE_URL: &str = "about:blank";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    // 标注属性，只出现在影子树和发往翻译服务的片段中
    pub const INDEX_ATTR: &str = "data-wt-index";
    pub const DISPLAY_ATTR: &str = "data-wt-display";
    pub const TEXT_WRAPPER_ATTR: &str = "data-wt-text";
    pub const SKIP_ATTR: &str = "data-wt-skip";
    pub const TEXT_WRAPPER_TAG: &str = "span";

    // 挂载判定
    pub const DEFAULT_TRANSLATE_TAG: &str = "wt-translate";
    pub const DEFAULT_OPT_IN_ATTR: &str = "data-wt-translate";
    pub const DEFAULT_ELIGIBLE_TAGS: &[&str] = &[
        "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "dt", "dd", "blockquote", "figcaption",
        "caption", "td", "th", "summary", "legend",
    ];

    // 内容不发送、不合并的元素
    pub const DEFAULT_SKIP_TAGS: &[&str] = &[
        "script", "style", "noscript", "template", "svg", "math", "canvas", "textarea", "code",
        "pre",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "dom-splice.toml",
        ".dom-splice.toml",
        "dom-splice.json",
        "~/.config/dom-splice/config.toml",
        "/etc/dom-splice/config.toml",
    ];
}

/// 加载配置，失败时退回默认值
pub fn load_translation_config(target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.create_simple_config(target_lang, api_url),
        Err(e) => {
            tracing::warn!("创建配置管理器失败，使用默认配置: {}", e);
            TranslationConfig::default_with_lang(target_lang, api_url)
        }
    }
}
