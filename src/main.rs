//! subwatch - Subtitle Translation Watcher
//!
//! Polls the configured directories for SRT and ASS subtitle files, translates
//! new ones through DeepL and records every processed file in a ledger.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subwatch::cli::Args;
use subwatch::config::Config;
use subwatch::workflow::{TokioSleeper, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The guard flushes the file writer when main returns
    let _guard = setup_logging(args.verbose)?;

    info!("Starting subwatch");

    let mut config = load_config(args.config.as_deref())?;
    config.apply_env()?;
    config.validate()?;

    // A malformed ledger fails here and ends the process
    let mut workflow = Workflow::from_config(&config)?;

    if let Some(file) = args.file {
        let path = std::path::absolute(&file).unwrap_or(file);
        let outcome = workflow.process_file(&path).await?;
        info!("{}: {:?}", path.display(), outcome);
        return Ok(());
    }

    if args.once {
        workflow.scan_once().await?;
        return Ok(());
    }

    workflow.run(&TokioSleeper).await;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            let default_path = PathBuf::from("config.toml");
            if default_path.exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file(&default_path)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subwatch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subwatch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subwatch.log").display()
    );

    Ok(guard)
}
