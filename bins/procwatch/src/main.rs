use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use procwatch_engine::{default_log_directory, HostedService, WatchdogConfig, WatchdogService};
use procwatch_log::{DailyFileSink, EventLog};
use procwatch_process::{platform_window_inspector, NativeProcessControl};

/// procwatch - keeps configured executables running and restarts hung ones
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Comma-separated executable paths (overrides process_address)
    #[arg(short, long, value_name = "PATHS")]
    paths: Option<String>,

    /// Directory for the daily log files (overrides log_directory)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Run duration in seconds (for testing)
    #[arg(long)]
    run_duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_config(&args);
    let level = match (&loaded, args.debug) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.watchdog.log_level.to_lowercase(),
        (Err(_), false) => "info".to_string(),
    };
    initialize_logging(&level)?;

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            // No usable configuration: report to the default log directory
            let directory = args
                .log_dir
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(default_log_directory);
            let log = EventLog::new(Arc::new(DailyFileSink::new(directory)));
            log.error(format!("Configuration error: {:#}", e));
            return Err(e);
        }
    };

    info!("Starting procwatch");
    info!("Log directory: {}", config.log_directory().display());

    let log = EventLog::new(Arc::new(DailyFileSink::new(config.log_directory())));
    let service = WatchdogService::new(
        config,
        Arc::new(NativeProcessControl::new()),
        platform_window_inspector(),
        log,
    );

    if let Err(e) = service.on_start(&[]).await {
        error!("Failed to start procwatch: {}", e);
        return Err(anyhow!("Start failed: {}", e));
    }

    // Wait for shutdown signal or run duration
    if let Some(duration) = args.run_duration {
        info!("Running for {} seconds (test mode)", duration);
        tokio::time::sleep(tokio::time::Duration::from_secs(duration)).await;
    } else {
        wait_for_shutdown_signal().await?;
    }

    info!("Shutting down procwatch...");
    service
        .on_stop()
        .await
        .map_err(|e| anyhow!("Shutdown failed: {}", e))?;
    info!("procwatch shut down successfully");

    Ok(())
}

fn load_config(args: &Args) -> Result<WatchdogConfig> {
    let mut config = match (&args.config, &args.paths) {
        (Some(file), _) => WatchdogConfig::parse_from_file(file)?,
        (None, Some(paths)) => WatchdogConfig::from_process_address(paths.as_str())?,
        (None, None) => {
            return Err(anyhow!(
                "process_address is not configured: pass --config FILE or --paths PATHS"
            ))
        }
    };

    // Command-line values win over the file, then the result is validated once
    config.apply_overrides(args.paths.as_deref(), args.log_dir.as_deref());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn initialize_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C signal");
    }

    Ok(())
}
