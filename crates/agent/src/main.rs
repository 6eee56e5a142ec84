//! Roost - Edge telemetry agent
//!
//! Subscribes to an MQTT broker, validates inbound messages against a
//! declared schema, and persists accepted messages to rotating local
//! JSONL files for offline retrieval.
//!
//! # Usage
//!
//! ```bash
//! # Run the agent (default)
//! roost
//! roost --config /etc/roost/config.toml
//!
//! # Validate a configuration and schema without starting
//! roost check --config /etc/roost/config.toml
//! ```

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roost_config::LogFormat;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Roost - Edge telemetry agent
#[derive(Parser, Debug)]
#[command(name = "roost")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, default_value = "configs/roost.toml", global = true)]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the telemetry agent (default)
    Serve,

    /// Validate configuration and schema, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Check) => {
            init_logging("warn", LogFormat::Console)?;
            cmd::check::run(&cli.config)
        }
        // No subcommand = run the agent
        Some(Command::Serve) | None => serve(cli.config, cli.log_level).await,
    }
}

async fn serve(config_path: PathBuf, log_level: Option<String>) -> Result<()> {
    // The config decides logging unless the CLI overrides it, so load
    // it before the subscriber goes up.
    let config = roost_config::Config::from_file(&config_path)?;

    let level = log_level.unwrap_or_else(|| config.log.level.as_str().to_owned());
    init_logging(&level, config.log.format)?;

    cmd::serve::run(&config_path, config).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
    }

    Ok(())
}
