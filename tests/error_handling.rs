//! 错误处理集成测试
//!
//! 配置错误、环境变量校验、不可重试的服务错误，以及 HTTP 翻译服务的失败路径

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use futures::future::{BoxFuture, FutureExt};

use dom_splice::env::{translation as env_vars, EnvVar};
use dom_splice::translation::{
    ConfigManager, ErrorCategory, ErrorSeverity, HttpTranslator, TranslatedUnit,
    TranslationConfig, TranslationEngine, TranslationError, TranslationResult, Translator, Unit,
};

mod common {
    include!("common/mod.rs");
}

use common::{attach_all, test_config, HtmlTestHelper};

/// 一次性的本地 HTTP 服务：按顺序为每个连接返回一个预设响应
fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream);

            let reason = match status {
                200 => "OK",
                429 => "Too Many Requests",
                _ => "Service Unavailable",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (format!("http://{}/translate", addr), hits)
}

/// 读完请求头和请求体
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn http_config(api_url: &str) -> TranslationConfig {
    TranslationConfig {
        api_url: api_url.to_string(),
        request_timeout_secs: 5,
        ..test_config()
    }
}

/// 错误分类
#[test]
fn test_error_classification() {
    let cases = vec![
        (TranslationError::NetworkError("reset".into()), true, ErrorCategory::Network),
        (TranslationError::RateLimitExceeded, true, ErrorCategory::RateLimit),
        (TranslationError::TranslationServiceError("502".into()), true, ErrorCategory::Service),
        (TranslationError::ConfigError("bad".into()), false, ErrorCategory::Configuration),
        (TranslationError::InvalidInput("bad".into()), false, ErrorCategory::Input),
        (TranslationError::QueueClosed, false, ErrorCategory::Dispatch),
        (
            TranslationError::BatchDropped {
                batch: 1,
                attempts: 2,
                reason: "down".into(),
            },
            false,
            ErrorCategory::Dispatch,
        ),
    ];

    for (error, retryable, category) in cases {
        assert_eq!(error.is_retryable(), retryable, "{}", error);
        assert_eq!(error.category(), category, "{}", error);
    }

    assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
    assert_eq!(
        TranslationError::ConfigError("x".into()).severity(),
        ErrorSeverity::Critical
    );
}

/// 错误上下文
#[test]
fn test_error_context() {
    let error = TranslationError::NetworkError("timeout".into()).with_context("批次 #3");
    let message = error.to_string();
    assert!(message.contains("timeout"));
    assert!(message.contains("批次 #3"));

    // 无消息的变体保持原样
    let closed = TranslationError::QueueClosed.with_context("ignored");
    assert!(!closed.to_string().contains("ignored"));
}

/// 配置校验
#[test]
fn test_invalid_configuration_is_rejected() {
    let zero_batch = TranslationConfig {
        max_batch_units: 0,
        ..TranslationConfig::default()
    };
    let bad_page = TranslationConfig {
        page_url: "not a url".to_string(),
        ..TranslationConfig::default()
    };
    let bad_scheme = TranslationConfig {
        api_url: "ftp://example.com/translate".to_string(),
        ..TranslationConfig::default()
    };
    let no_lang = TranslationConfig {
        target_lang: "  ".to_string(),
        ..TranslationConfig::default()
    };

    for config in [zero_batch, bad_page, bad_scheme, no_lang] {
        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));
    }
    assert!(TranslationConfig::default().validate().is_ok());
}

/// 配置文件错误
#[test]
fn test_config_file_errors() {
    assert!(matches!(
        ConfigManager::from_file("/nonexistent/dom-splice.toml"),
        Err(TranslationError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigManager::parse_config("dom-splice.toml", "max_batch_units = \"many\""),
        Err(TranslationError::ConfigError(_))
    ));
    assert!(matches!(
        ConfigManager::parse_config("dom-splice.json", "{not json"),
        Err(TranslationError::ConfigError(_))
    ));
}

/// 环境变量取值范围
#[test]
fn test_env_values_are_range_checked() {
    assert_eq!(env_vars::MaxBatchUnits::parse("25").unwrap(), 25);
    assert!(env_vars::MaxBatchUnits::parse("0").is_err());
    assert!(env_vars::MaxBatchUnits::parse("lots").is_err());
    assert!(env_vars::MaxRetryAttempts::parse("2").is_err());
    assert_eq!(
        env_vars::BatchWindow::parse("40").unwrap(),
        std::time::Duration::from_millis(40)
    );
    assert!(env_vars::RequestTimeout::parse("0").is_err());

    let error = env_vars::BatchWindow::parse("9999").unwrap_err();
    assert_eq!(error.variable, env_vars::BatchWindow::NAME);
}

/// 拒绝输入的翻译服务
struct Rejecting {
    calls: AtomicUsize,
}

impl Translator for Rejecting {
    fn translate_batch<'a>(
        &'a self,
        _units: &'a [Unit],
    ) -> BoxFuture<'a, TranslationResult<Vec<TranslatedUnit>>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TranslationError::InvalidInput("payload rejected".into()))
        }
        .boxed()
    }
}

/// 不可重试的错误不会重试
#[tokio::test]
async fn test_permanent_error_is_not_retried() {
    let (_dom, root) = HtmlTestHelper::fragment("<p>Nope</p>");
    let translator = Arc::new(Rejecting {
        calls: AtomicUsize::new(0),
    });
    let mut engine = TranslationEngine::new(translator.clone(), test_config());

    engine.setup(&root).unwrap();
    let report = engine.shutdown().await;

    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].attempts, 1);
    assert!(matches!(report.failures[0].error, TranslationError::InvalidInput(_)));
    assert_eq!(HtmlTestHelper::inner(&root), "<p>Nope</p>");
}

/// HTTP 往返：请求体携带单元，响应按指纹合并
#[tokio::test]
async fn test_http_round_trip() {
    let html = "<p>Hello</p>";
    let config = http_config("http://127.0.0.1:1/translate");

    // 指纹只取决于内容、位置和页面地址，可以预先算出
    let (_sample_dom, sample_root) = HtmlTestHelper::fragment(html);
    let (_registry, units) = attach_all(&sample_root, &config);
    let body = serde_json::json!({
        "results": [{ "id": units[0].id, "content": "你好" }]
    })
    .to_string();

    let (api_url, hits) = serve(vec![(200, body)]);
    let config = http_config(&api_url);
    let (_dom, root) = HtmlTestHelper::fragment(html);
    let translator = Arc::new(HttpTranslator::new(&config).unwrap());
    let mut engine = TranslationEngine::new(translator, config);

    engine.setup(&root).unwrap();
    let report = engine.shutdown().await;

    assert!(report.is_complete());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(HtmlTestHelper::inner(&root), "<p>你好</p>");
}

/// 速率限制后重试成功
#[tokio::test]
async fn test_http_rate_limit_is_retried() {
    let (api_url, hits) = serve(vec![
        (429, String::new()),
        (200, "{\"results\": []}".to_string()),
    ]);
    let (_dom, root) = HtmlTestHelper::fragment("<p>Later</p>");
    let config = http_config(&api_url);
    let mut engine = TranslationEngine::new(Arc::new(HttpTranslator::new(&config).unwrap()), config);

    engine.setup(&root).unwrap();
    let report = engine.shutdown().await;

    assert!(report.is_complete());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // 服务没有返回结果，原文保留
    assert_eq!(report.results_merged, 0);
    assert_eq!(HtmlTestHelper::inner(&root), "<p>Later</p>");
}

/// 服务端错误重试一次后丢弃
#[tokio::test]
async fn test_http_service_error_drops_batch() {
    let (api_url, hits) = serve(vec![
        (503, "busy".to_string()),
        (503, "still busy".to_string()),
    ]);
    let (_dom, root) = HtmlTestHelper::fragment("<p>Down</p>");
    let config = http_config(&api_url);
    let mut engine = TranslationEngine::new(Arc::new(HttpTranslator::new(&config).unwrap()), config);

    engine.setup(&root).unwrap();
    let report = engine.shutdown().await;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.attempts, 2);
    match &failure.error {
        TranslationError::TranslationServiceError(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("still busy"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(HtmlTestHelper::inner(&root), "<p>Down</p>");
}
