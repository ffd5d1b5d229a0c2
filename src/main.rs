//! HTTP Mocker - CLI Entry Point
//!
//! Resolves a request against scenario files offline, and validates or
//! converts scenario files.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use http_mocker::{
    Chain, HttpRequest, HttpResponse, JsonFormatConverter, JsonMapper, Mapper, MockError,
    MockerConfig, YamlMapper,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = r#"# HTTP Mocker configuration

# disabled | enabled | mixed
mode: enabled

# Delay applied to responses that do not set their own, in milliseconds
delay_ms: 0

scenarios:
  root: scenarios
  # mirror_path | single_folder | server_specific
  policy: mirror_path
  # folder: flat
  # json | yaml
  format: json

settings:
  log_matches: true
  log_unmatched: true
  case_insensitive_headers: true
"#;

#[derive(Parser, Debug)]
#[command(
    name = "http-mocker",
    about = "Scenario-based HTTP mocking - resolve requests against scenario files offline",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mocker.yaml")]
    config: PathBuf,

    /// HTTP method of the request to resolve
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Absolute URL of the request to resolve
    #[arg(short, long)]
    url: Option<String>,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    body: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate a scenario file and exit
    #[arg(long, value_name = "SCENARIO")]
    validate: Option<PathBuf>,

    /// Print a scenario file with headers and params in compact form
    #[arg(long, value_name = "FILE")]
    compact: Option<PathBuf>,

    /// Print a scenario file with headers and params in expanded form
    #[arg(long, value_name = "FILE")]
    expand: Option<PathBuf>,
}

/// Network continuation for offline use: nothing gets through.
struct Offline;

#[async_trait]
impl Chain for Offline {
    async fn proceed(&self, request: &HttpRequest) -> Result<HttpResponse, MockError> {
        Err(MockError::Upstream(anyhow::anyhow!(
            "network access is disabled, no mock answered {request}"
        )))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        println!("{}", DEFAULT_CONFIG);
        return Ok(());
    }

    if let Some(path) = &args.validate {
        let count = validate_scenario(path)?;
        println!("Scenario file is valid ({} records defined)", count);
        return Ok(());
    }

    if let Some(path) = &args.compact {
        let content = read(path)?;
        println!("{}", JsonFormatConverter::new().compact(&content)?);
        return Ok(());
    }

    if let Some(path) = &args.expand {
        let content = read(path)?;
        println!("{}", JsonFormatConverter::new().expand(&content)?);
        return Ok(());
    }

    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        MockerConfig::from_file(&args.config)?
    } else {
        info!("Using default configuration");
        MockerConfig::default()
    };

    let Some(url) = &args.url else {
        anyhow::bail!("No request to resolve, pass --url");
    };
    let request = build_request(&args.method, url, &args.headers, args.body.clone())?;

    let interceptor = config.build_interceptor()?;
    let response = interceptor.intercept(&request, &Offline).await?;
    print_response(&response);

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

/// Parse a scenario file and check every body pattern.
fn validate_scenario(path: &Path) -> Result<usize> {
    let content = read(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let records = if is_yaml {
        YamlMapper.deserialize(&content)?
    } else {
        JsonMapper::new().deserialize(&content)?
    };
    for (i, record) in records.iter().enumerate() {
        record
            .request
            .validate()
            .map_err(|e| anyhow::anyhow!("Record {}: {}", i, e))?;
    }
    Ok(records.len())
}

fn build_request(method: &str, url: &str, headers: &[String], body: Option<String>) -> Result<HttpRequest> {
    let mut request = HttpRequest::parse(method, url).with_context(|| format!("Invalid URL: {url}"))?;
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Invalid header, expected \"Name: value\": {header}"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }
    Ok(request)
}

fn print_response(response: &HttpResponse) {
    println!("{} {}", response.code, response.message);
    println!("Content-Type: {}", response.media_type);
    for header in &response.headers {
        println!("{}: {}", header.name, header.value);
    }
    println!();
    println!("{}", response.body);
}
