//! piitag - PII field classification service
//!
//! Serves the classification API, or runs one-off classification and
//! reporting against the configured store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use piitag::{
    api::{self, Services},
    audit::describe_pii,
    compliance::ComplianceReport,
    config::PiitagConfig,
    privacy::store_from_config,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "piitag")]
#[command(version)]
#[command(about = "PII field classification for audit logging and compliance reporting")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PIITAG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Classify the fields of one JSON record
    Classify {
        /// Table the record belongs to
        #[arg(short, long)]
        table: String,

        /// Record as a JSON object
        #[arg(short, long)]
        record: String,
    },

    /// Print the personal data inventory
    Report {
        /// Render HTML instead of JSON
        #[arg(long)]
        html: bool,
    },

    /// Load the classification store once and report the result
    Check,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("piitag={},tower_http={}", log_level, log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = PiitagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await?,
        Commands::Classify { table, record } => run_classify(config, &table, &record).await?,
        Commands::Report { html } => run_report(config, html).await?,
        Commands::Check => run_check(config).await?,
        Commands::Config { default } => show_config(if default { None } else { Some(&config) })?,
    }

    Ok(())
}

async fn run_serve(mut config: PiitagConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting piitag API");
    api::serve(config).await?;
    Ok(())
}

async fn run_classify(config: PiitagConfig, table: &str, record: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(record).context("--record is not valid JSON")?;
    let Some(record) = value.as_object() else {
        bail!("--record must be a JSON object");
    };

    let services = Services::from_config(&config)?;
    let result = services.cache.classify_fields(record, table).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!("{}", describe_pii(&result));
    Ok(())
}

async fn run_report(config: PiitagConfig, html: bool) -> Result<()> {
    let services = Services::from_config(&config)?;
    let classifications = services.cache.get_classifications().await;
    let report = ComplianceReport::build(&classifications);

    if html {
        println!("{}", report.render_html());
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn run_check(config: PiitagConfig) -> Result<()> {
    let store = store_from_config(&config.store)?;
    println!("Checking {} classification store...", store.name());

    match store.load_all().await {
        Ok(rows) => {
            let pii = rows.iter().filter(|r| r.is_pii()).count();
            let sensitive = rows.iter().filter(|r| r.is_sensitive).count();
            println!("  ✓ {} rows loaded ({} personal data, {} sensitive)", rows.len(), pii, sensitive);
            Ok(())
        }
        Err(e) => {
            println!("  ✗ {}", e);
            bail!("classification store check failed")
        }
    }
}

fn show_config(config: Option<&PiitagConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
