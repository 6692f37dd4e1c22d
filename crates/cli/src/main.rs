use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strmsync_core::{
    load_config, metrics::gather_metrics, validate_config, Config, DebridApi, LogFormat,
    LoggingConfig, MaintenanceReport, RealDebridClient, SanitizedConfig, SweepMode, SyncEngine,
    SyncWatcher, WatchOptions,
};

#[derive(Parser)]
#[command(name = "strmsync")]
#[command(about = "Mirror a Real-Debrid account into a .strm media library", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "STRMSYNC_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the library once, or keep it in sync
    Run {
        /// Keep running and pick up new torrents as they appear
        #[arg(long)]
        watch: bool,

        /// Skip the health check and dead torrent repair
        #[arg(long)]
        no_health_check: bool,
    },

    /// Delete downloads that duplicate a newer download of the same link
    DedupeDownloads {
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Check whether a hoster link can be unrestricted right now
    CheckLink {
        /// Hoster link
        link: String,

        /// Password for protected links
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete every download on the account
    ClearDownloads {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    init_tracing(&config.logging, cli.verbose)?;

    validate_config(&config).context("Configuration validation failed")?;
    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Configuration loaded"
    );

    let client = RealDebridClient::new(&config.debrid).context("Failed to create API client")?;
    let api: Arc<dyn DebridApi> = Arc::new(client);

    let command = cli.command.unwrap_or(Command::Run {
        watch: false,
        no_health_check: false,
    });

    match command {
        Command::Run {
            watch,
            no_health_check,
        } => {
            let engine = SyncEngine::from_config(api, &config).with_health_check(!no_health_check);
            if watch || config.watch.enabled {
                run_watch(engine, &config).await?;
            } else {
                run_once(&engine).await?;
            }
        }
        Command::DedupeDownloads { dry_run } => {
            let engine = SyncEngine::from_config(api, &config);
            let report = engine
                .remove_duplicate_downloads(dry_run)
                .await
                .context("Failed to remove duplicate downloads")?;
            log_maintenance("dedupe-downloads", &report);
        }
        Command::CheckLink { link, password } => {
            let engine = SyncEngine::from_config(api, &config);
            let check = engine
                .check_link(&link, password.as_deref())
                .await
                .context("Failed to check link")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&check).context("Failed to render link check")?
            );
            if !check.is_supported() {
                bail!("Link {} is not currently supported", link);
            }
        }
        Command::ClearDownloads { yes } => {
            if !yes {
                bail!("clear-downloads deletes every download on the account, pass --yes to confirm");
            }
            let engine = SyncEngine::from_config(api, &config);
            let report = engine
                .clear_downloads()
                .await
                .context("Failed to clear downloads")?;
            log_maintenance("clear-downloads", &report);
        }
    }

    if let Some(path) = &config.metrics.textfile {
        write_metrics(path).await;
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level {:?}", level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
    Ok(())
}

async fn run_once(engine: &SyncEngine) -> Result<()> {
    info!(
        library = %engine.writer().root().display(),
        health_check = engine.options().health_check,
        "Starting sync"
    );
    let stats = engine
        .run_once(SweepMode::Full)
        .await
        .context("Sync failed")?;
    stats.log_summary();
    Ok(())
}

async fn run_watch(engine: SyncEngine, config: &Config) -> Result<()> {
    let watcher = SyncWatcher::new(Arc::new(engine), WatchOptions::from_config(&config.watch));
    let Some(handle) = watcher.start().await else {
        bail!("Watch loop already running");
    };

    shutdown_signal().await;
    info!("Shutdown requested, finishing current iteration");
    watcher.stop();

    handle.await.context("Watch loop panicked")?;

    let status = watcher.status().await;
    info!(
        iterations = status.iterations,
        full_sweeps = status.full_sweeps,
        failed = status.failed_iterations,
        known_torrents = status.known_torrents,
        "Watch loop finished"
    );
    Ok(())
}

fn log_maintenance(task: &str, report: &MaintenanceReport) {
    info!(
        task,
        examined = report.examined,
        targeted = report.targeted,
        deleted = report.deleted,
        failed = report.failed,
        dry_run = report.dry_run,
        "Maintenance complete"
    );
}

async fn write_metrics(path: &Path) {
    let text = match gather_metrics() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to gather metrics");
            return;
        }
    };
    if let Err(e) = tokio::fs::write(path, text).await {
        warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
}
