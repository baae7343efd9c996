//! 翻译服务协作方
//!
//! 引擎只依赖 [`Translator`] 这一个批量接口。两种常见的服务形态都能接入：
//!
//! - 无状态的批量翻译：直接实现 [`Translator`]，例如 [`HttpTranslator`]
//! - 先查后建的缓存服务：实现 [`CacheFirstTranslator`]，再用 [`QueryOrCreate`] 包装

use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::translation::error::TranslationResult;
use crate::translation::pipeline::Unit;

/// 翻译结果：单元指纹 + 带同样序号标注的译文片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedUnit {
    pub id: String,
    pub content: String,
}

impl TranslatedUnit {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// 批量翻译接口
///
/// 返回结果的顺序不必与输入一致，合并完全依赖 `id`。
pub trait Translator: Send + Sync {
    fn translate_batch<'a>(
        &'a self,
        units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate_batch<'a>(
        &'a self,
        units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
        (**self).translate_batch(units)
    }
}

/// 先查后建的单元级翻译服务
pub trait CacheFirstTranslator: Send + Sync {
    /// 查找已有译文，`Ok(None)` 表示未命中
    fn query<'a>(&'a self, unit: &'a Unit) -> BoxFuture<'a, TranslationResult<Option<TranslatedUnit>>>;

    /// 提交新的翻译
    fn create<'a>(&'a self, unit: &'a Unit) -> BoxFuture<'a, TranslationResult<TranslatedUnit>>;
}

/// 把 [`CacheFirstTranslator`] 适配为批量接口
///
/// 批内单元并发解析，任一单元失败则整批失败。
pub struct QueryOrCreate<T> {
    inner: T,
}

impl<T: CacheFirstTranslator> QueryOrCreate<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// 查找，未命中时创建
    pub async fn query_or_create(&self, unit: &Unit) -> TranslationResult<TranslatedUnit> {
        match self.inner.query(unit).await? {
            Some(found) => {
                tracing::trace!("缓存命中: {}", unit.id);
                Ok(found)
            }
            None => {
                tracing::debug!("缓存未命中，提交翻译: {}", unit.id);
                self.inner.create(unit).await
            }
        }
    }
}

impl<T: CacheFirstTranslator> Translator for QueryOrCreate<T> {
    fn translate_batch<'a>(
        &'a self,
        units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
        async move {
            join_all(units.iter().map(|unit| self.query_or_create(unit)))
                .await
                .into_iter()
                .collect()
        }
        .boxed()
    }
}

#[cfg(feature = "http")]
pub use http::HttpTranslator;

#[cfg(feature = "http")]
mod http {
    use reqwest::header::CONTENT_TYPE;
    use serde::{Deserialize, Serialize};

    use super::{BoxFuture, FutureExt, TranslatedUnit, Translator};
    use crate::translation::config::TranslationConfig;
    use crate::translation::error::{helpers, TranslationError, TranslationResult};
    use crate::translation::pipeline::Unit;

    #[derive(Serialize)]
    struct BatchRequest<'a> {
        source_lang: &'a str,
        target_lang: &'a str,
        units: &'a [Unit],
    }

    #[derive(Deserialize)]
    struct BatchResponse {
        results: Vec<TranslatedUnit>,
    }

    /// 通过 HTTP JSON 接口批量翻译
    ///
    /// 请求体为 `{source_lang, target_lang, units: [{id, locator, payload}]}`，
    /// 响应体为 `{results: [{id, content}]}`。
    pub struct HttpTranslator {
        client: reqwest::Client,
        api_url: String,
        source_lang: String,
        target_lang: String,
    }

    impl HttpTranslator {
        pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()?;

            Ok(Self {
                client,
                api_url: config.api_url.clone(),
                source_lang: config.source_lang.clone(),
                target_lang: config.target_lang.clone(),
            })
        }

        pub fn api_url(&self) -> &str {
            &self.api_url
        }

        async fn post(&self, units: &[Unit]) -> TranslationResult<Vec<TranslatedUnit>> {
            let body = serde_json::to_vec(&BatchRequest {
                source_lang: &self.source_lang,
                target_lang: &self.target_lang,
                units,
            })?;

            tracing::debug!("POST {} ({} 个单元, {} 字节)", self.api_url, units.len(), body.len());

            let response = self
                .client
                .post(&self.api_url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;

            let status = response.status();
            if status.as_u16() == 429 {
                return Err(TranslationError::RateLimitExceeded);
            }
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(helpers::service_error(format!("HTTP {}: {}", status, detail)));
            }

            let bytes = response.bytes().await?;
            let parsed: BatchResponse = serde_json::from_slice(&bytes)?;
            Ok(parsed.results)
        }
    }

    impl Translator for HttpTranslator {
        fn translate_batch<'a>(
            &'a self,
            units: &'a [Unit],
        ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
            self.post(units).boxed()
        }
    }
}
