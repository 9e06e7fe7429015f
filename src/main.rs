//! Main entry point for the Mandrill exporter
//!
//! Loads configuration, initializes logging and serves the exporter until
//! SIGINT or SIGTERM, then drains in-flight scrapes and exits.

use anyhow::Result;
use clap::Parser;
use mandrill_exporter::config::AppConfig;
use mandrill_exporter::service::{shutdown_signal, AppState};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Mandrill Exporter - Prometheus metrics for Mandrill tag statistics
#[derive(Parser)]
#[command(
    name = "mandrill-exporter",
    version,
    about = "Exports Mandrill per-tag delivery statistics as Prometheus metrics",
    long_about = "Mandrill Exporter fetches per-tag statistics from the Mandrill API on every \
                 scrape and serves them on /metrics, with a liveness probe on /healthz. \
                 The API key is read from the MANDRILL_API_KEY environment variable."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Listen address override
    #[arg(
        long,
        value_name = "ADDR",
        help = "Server listen address, e.g. :9153 or 127.0.0.1:9153"
    )]
    listen_addr: Option<String>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting the server"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Mandrill Exporter {}", mandrill_exporter::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listen address: {}", config.service.listen_addr);
    info!("   Mandrill API: {}", config.upstream.url);
    info!("   Metrics namespace: {}", config.metrics.namespace);
    info!(
        "   Shutdown timeout: {}s",
        config.service.shutdown_timeout_seconds
    );
    if config.upstream.api_key.is_empty() {
        warn!("MANDRILL_API_KEY is not set, Mandrill will reject every request");
    }
}

/// Load configuration from file or environment and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(listen_addr) = &args.listen_addr {
        config.service.listen_addr = listen_addr.clone();
    }

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    mandrill_exporter::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Dry run completed - exiting without starting the server");
        return Ok(());
    }

    let app_state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize exporter: {}", e);
            std::process::exit(1);
        }
    };

    info!("Server is starting...");
    if let Err(e) = app_state.run(shutdown_signal()).await {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Mandrill Exporter stopped");
    Ok(())
}
