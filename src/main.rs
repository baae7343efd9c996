//! 命令行入口
//!
//! 读取 HTML 文档，原位翻译后写出；`--units` 只打印切分出的单元。

use std::fs;
use std::io::{self, Read, Write};
use std::process;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;

use dom_splice::env::{core::LogLevel, generate_env_docs, EnvVar};
use dom_splice::parsers::html::{get_charset, html_to_dom, serialize_document};
use dom_splice::translation::core::{AttachController, TagEligibility};
use dom_splice::translation::error::helpers;
use dom_splice::translation::{
    ConfigManager, DefaultStyleOracle, HttpTranslator, TranslationConfig, TranslationEngine,
    TranslationResult, Unit, UnitRegistry,
};

const DEFAULT_ENCODING: &str = "utf-8";

/// Translate an HTML document in place, preserving its structure
#[derive(Parser, Debug)]
#[command(name = "dom-splice", version, about)]
struct Cli {
    /// Input HTML file, or "-" for stdin
    #[arg(required_unless_present_any = ["init_config", "env_docs"])]
    input: Option<String>,

    /// Write the translated document here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Translation API endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Target language (ISO 639-1)
    #[arg(long)]
    target_lang: Option<String>,

    /// Page address used in unit locators
    #[arg(long)]
    page_url: Option<String>,

    /// Document charset; detected from <meta> when omitted
    #[arg(short, long)]
    encoding: Option<String>,

    /// Print the translation units as JSON and exit without translating
    #[arg(long)]
    units: bool,

    /// Write an example configuration file to PATH and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<String>,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging() {
    let level = match LogLevel::get_or_default("info".to_string()).as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> TranslationResult<()> {
    if cli.env_docs {
        print!("{}", generate_env_docs());
        return Ok(());
    }
    if let Some(path) = &cli.init_config {
        ConfigManager::generate_example_config(path)?;
        eprintln!("已写入示例配置: {}", path);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let input = cli.input.as_deref().unwrap_or("-");
    let data = read_input(input)?;

    let (dom, encoding) = match &cli.encoding {
        Some(label) => (html_to_dom(&data, label.clone()), label.clone()),
        None => {
            let dom = html_to_dom(&data, DEFAULT_ENCODING.to_string());
            match get_charset(&dom.document) {
                Some(charset) if !charset.eq_ignore_ascii_case(DEFAULT_ENCODING) => {
                    tracing::debug!("按文档声明的字符集 {} 重新解析", charset);
                    (html_to_dom(&data, charset.clone()), charset)
                }
                _ => (dom, DEFAULT_ENCODING.to_string()),
            }
        }
    };

    if cli.units {
        let units = collect_units(&config, &dom.document)?;
        println!("{}", serde_json::to_string_pretty(&units)?);
        return Ok(());
    }

    let translator = Arc::new(HttpTranslator::new(&config)?);
    let mut engine = TranslationEngine::new(translator, config);
    let report = engine.translate_document(&dom.document).await?;

    if !report.failures.is_empty() {
        tracing::warn!("{} 个批次翻译失败，相应内容保持原文", report.failures.len());
    }

    let bytes = serialize_document(dom, encoding)?;
    write_output(cli.output.as_deref(), &bytes)
}

fn load_config(cli: &Cli) -> TranslationResult<TranslationConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };

    let mut config = manager.get_config().clone();
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(target_lang) = &cli.target_lang {
        config.target_lang = target_lang.clone();
    }
    if let Some(page_url) = &cli.page_url {
        config.page_url = page_url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn collect_units(
    config: &TranslationConfig,
    root: &markup5ever_rcdom::Handle,
) -> TranslationResult<Vec<Unit>> {
    let controller = AttachController::new(
        Rc::new(DefaultStyleOracle),
        Box::new(TagEligibility::from_config(config)),
        config,
    );
    let mut registry = UnitRegistry::new();
    let mut units: Vec<Unit> = Vec::new();

    controller.scan(&mut registry, root, &mut units)?;
    Ok(units)
}

fn read_input(input: &str) -> TranslationResult<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input)
            .map_err(|e| helpers::validation_error(format!("无法读取 {}: {}", input, e)))
    }
}

fn write_output(output: Option<&str>, bytes: &[u8]) -> TranslationResult<()> {
    match output {
        Some(path) if path != "-" => fs::write(path, bytes)?,
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
