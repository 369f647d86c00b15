//! Redactline: PII detection and redaction for text documents
//!
//! Usage:
//! ```bash
//! # Start the HTTP API
//! redactline serve --config redactline.yaml
//!
//! # List the PII found in a file
//! redactline scan notes.txt --json
//!
//! # Write a redacted copy plus an audit trail
//! redactline redact notes.txt --style labels --threshold 0.8
//! ```
//!
//! Test the API with:
//! ```bash
//! curl http://localhost:5000/api/analyze \
//!   -H "Content-Type: application/json" \
//!   -d '{"text": "Contact John Smith at john.smith@email.com"}'
//! ```

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use redactline_pii::{
    DetectionEngine, PIIType, RedactionOptions, RedactionStyle, assess_risk, redact,
};
use redactline_server::export::{save_audit_trail, save_redacted_document};
use redactline_server::extract::{extract_text, validate_upload};
use redactline_server::store::spawn_purge_task;
use redactline_server::{
    AppState, DocumentStore, InMemoryDocumentStore, ServerConfig, logging, router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// How often expired documents are dropped from the store
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Redactline - PII detection and redaction
#[derive(Parser)]
#[command(name = "redactline", version)]
#[command(about = "Detect and redact personally identifiable information", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REDACTLINE_CONFIG",
        global = true
    )]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides the config file)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default if no command specified)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the PII detected in a text file
    Scan {
        file: PathBuf,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a redacted copy and an audit trail for a text file
    Redact {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = StyleArg::BlackBars)]
        style: StyleArg,

        /// Use fixed-width placeholders instead of one mask character per
        /// original character
        #[arg(long)]
        no_preserve_length: bool,

        /// Only redact detections at or above this confidence
        #[arg(long, default_value_t = 0.0, value_parser = parse_threshold)]
        threshold: f32,

        /// Directory for the redacted document and audit trail
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    BlackBars,
    Asterisks,
    Labels,
}

impl From<StyleArg> for RedactionStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::BlackBars => RedactionStyle::BlackBars,
            StyleArg::Asterisks => RedactionStyle::Asterisks,
            StyleArg::Labels => RedactionStyle::Labels,
        }
    }
}

fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("{threshold} is outside 0.0..=1.0"));
    }
    Ok(threshold)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config file, then environment, then CLI flags
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init(&config.logging)?;
    match &cli.config {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Using default configuration"),
    }

    let engine = DetectionEngine::from_config(config.detector.clone())
        .context("Invalid detector configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config, engine).await
        }
        // CPU-bound commands run on the blocking pool
        Commands::Scan { file, json } => {
            tokio::task::spawn_blocking(move || scan(&config, &engine, &file, json)).await?
        }
        Commands::Redact {
            file,
            style,
            no_preserve_length,
            threshold,
            output_dir,
        } => {
            let options = RedactionOptions {
                style: style.into(),
                preserve_length: !no_preserve_length,
                confidence_threshold: threshold,
            };
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
            tokio::task::spawn_blocking(move || {
                redact_file(&config, &engine, &file, &options, &output_dir)
            })
            .await?
        }
    }
}

/// Read a local file under the upload policy and extract its text
fn read_document(config: &ServerConfig, file: &Path) -> anyhow::Result<(String, Option<String>)> {
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_type = validate_upload(&filename, bytes.len(), &config.uploads)?;

    Ok((filename, extract_text(&bytes, &file_type)))
}

fn scan(config: &ServerConfig, engine: &DetectionEngine, file: &Path, json: bool) -> anyhow::Result<()> {
    let (filename, text) = read_document(config, file)?;
    let Some(text) = text else {
        warn!(file = %filename, "No text found");
        return Ok(());
    };

    let report = engine.detect(&text);
    let risk = assess_risk(&report.detections);

    if json {
        let output = serde_json::json!({
            "file": filename,
            "detections": report.detections,
            "summary": report.summary,
            "risk": risk,
            "skipped_rules": report.skipped_rules,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}: {} detection(s), {} high confidence, risk {}",
        filename, report.summary.total_detections, report.summary.high_confidence, risk.risk_level
    );
    for detection in &report.detections {
        println!(
            "  {:<14} {:.2}  {:>6}..{:<6} {}",
            detection.pii_type, detection.confidence, detection.start, detection.end, detection.text
        );
    }
    for suggestion in &risk.suggestions {
        println!("- {}", suggestion);
    }
    warn_partial(&report.skipped_rules);

    Ok(())
}

fn redact_file(
    config: &ServerConfig,
    engine: &DetectionEngine,
    file: &Path,
    options: &RedactionOptions,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let (filename, text) = read_document(config, file)?;
    let Some(text) = text else {
        bail!("No text could be extracted from {}", file.display());
    };

    let report = engine.detect(&text);
    warn_partial(&report.skipped_rules);
    let result = redact(&text, &report.detections, options);

    let now = Local::now();
    let document_path = save_redacted_document(output_dir, &filename, &result.redacted_text, now)?;
    let audit_path = save_audit_trail(output_dir, &filename, &result.audit_trail, now)?;

    println!(
        "Redacted {} of {} detection(s) in {}",
        result.summary.total_redactions,
        report.detections.len(),
        filename
    );
    println!("  document: {}", document_path.display());
    println!("  audit:    {}", audit_path.display());

    Ok(())
}

/// Tell the user when rules ran out of time and the results are partial
fn warn_partial(skipped_rules: &[PIIType]) {
    if skipped_rules.is_empty() {
        return;
    }

    let names: Vec<&str> = skipped_rules.iter().map(|t| t.as_str()).collect();
    warn!(skipped = ?names, "Some rules ran out of time");
    eprintln!(
        "Warning: results are partial, these rules ran out of time: {}",
        names.join(", ")
    );
}

async fn serve(config: ServerConfig, engine: DetectionEngine) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new(
        Duration::from_secs(config.store.ttl_secs),
        config.store.max_documents,
    ));
    let purge_task = spawn_purge_task(store.clone(), PURGE_INTERVAL);

    let state = AppState::new(Arc::new(engine), store, config.uploads.clone());
    let app = router(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;

    info!("Redactline listening on http://{}", addr);
    info!("   - Analyze text:     POST http://{}/api/analyze", addr);
    info!("   - Upload document:  POST http://{}/api/upload (multipart)", addr);
    info!("   - List documents:   GET  http://{}/api/documents", addr);
    info!("   - Health check:     GET  http://{}/api/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
