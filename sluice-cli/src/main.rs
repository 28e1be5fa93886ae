//! Sluice CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sluice_config::load_config;
use sluice_runtime::{build_dialer, ServerBuilder, SignalHandler};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Forward HTTP/HTTPS proxy with optional overlay egress", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy
    Serve {
        /// Path to configuration file; environment variables alone are enough without one
        #[arg(short, long, env = "SLUICE_CONFIG")]
        config: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
        log_level: String,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Validate configuration
    Validate {
        /// Path to configuration file
        #[arg(short, long, env = "SLUICE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            log_level,
            json_logs,
        } => {
            init_tracing(&log_level, json_logs)?;

            match &config {
                Some(path) => tracing::info!("Config file: {}", path.display()),
                None => tracing::info!("No config file, using defaults and environment"),
            }

            let config = load_config(config.as_deref()).context("failed to load configuration")?;

            tracing::info!(
                listen = %config.proxy.listen,
                tunneled = config.is_tunneled(),
                "Configuration loaded"
            );

            // The overlay must be up before the listener opens
            let dialer = build_dialer(&config)
                .await
                .context("failed to bring up dialer")?;

            let server = ServerBuilder::new().config(config).dialer(dialer).build()?;

            let shutdown_signal = server.shutdown_signal();
            tokio::spawn(async move {
                let handler = SignalHandler::new(shutdown_signal);
                handler.run().await;
            });

            server.run().await?;

            tracing::info!("Proxy stopped");
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            match load_config(config.as_deref()) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Listen: {}", cfg.proxy.listen);
                    tracing::info!(
                        "  Auth: {}",
                        if cfg.credentials().is_enabled() {
                            "enabled"
                        } else {
                            "disabled"
                        }
                    );
                    match &cfg.overlay {
                        Some(overlay) => tracing::info!("  Overlay gateway: {}", overlay.gateway),
                        None => tracing::info!("  Overlay: none (direct dialing)"),
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Sluice forward proxy");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(filter.into())
        // Connection-level chatter from the HTTP stack
        .add_directive("hyper=warn".parse()?);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .init();
    }

    Ok(())
}
