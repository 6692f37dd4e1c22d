//! Watch loop implementation.
//!
//! Alternates between full sweeps (with health checks, gated by the health
//! interval) and incremental sweeps that only look at torrents not yet
//! processed. Shutdown is honoured between iterations, never inside one.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::types::{WatchOptions, WatchStatus};
use crate::engine::{SweepMode, SyncEngine};

/// Long-running driver of the sync engine.
pub struct SyncWatcher {
    engine: Arc<SyncEngine>,
    options: WatchOptions,

    // Runtime state
    running: Arc<AtomicBool>,
    status: Arc<RwLock<WatchStatus>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncWatcher {
    pub fn new(engine: Arc<SyncEngine>, options: WatchOptions) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            engine,
            options,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(WatchStatus::default())),
            shutdown_tx,
        }
    }

    /// Spawn the loop. Returns `None` if it is already running.
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Watch loop already running");
            return None;
        }

        self.status.write().await.running = true;
        info!(
            refresh_secs = self.options.refresh_interval.as_secs(),
            health_check_mins = self.options.health_check_interval.as_secs() / 60,
            "Starting watch loop"
        );

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let running = Arc::clone(&self.running);
        let status = Arc::clone(&self.status);
        let shutdown_rx = self.shutdown_tx.subscribe();

        Some(tokio::spawn(async move {
            Self::run_loop(engine, options, running, status, shutdown_rx).await;
        }))
    }

    /// Ask the loop to stop after its current iteration.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Watch loop not running");
            return;
        }
        info!("Stopping watch loop");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> WatchStatus {
        self.status.read().await.clone()
    }

    async fn run_loop(
        engine: Arc<SyncEngine>,
        options: WatchOptions,
        running: Arc<AtomicBool>,
        status: Arc<RwLock<WatchStatus>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut processed: HashSet<String> = HashSet::new();
        let mut last_full: Option<Instant> = None;

        while running.load(Ordering::Relaxed) {
            let full = last_full.map_or(true, |at| at.elapsed() >= options.health_check_interval);
            let mode = if full {
                info!("Starting full sweep");
                SweepMode::Full
            } else {
                SweepMode::NewOnly(&processed)
            };

            let result = engine.run_once(mode).boxed().await;

            let delay = {
                let mut status = status.write().await;
                status.iterations += 1;
                status.last_sweep_at = Some(Utc::now());

                match result {
                    Ok(stats) => {
                        if full {
                            last_full = Some(Instant::now());
                            status.full_sweeps += 1;
                            stats.log_summary();
                            // Forget torrents no longer on the account
                            let listed: HashSet<&str> =
                                stats.account_ids.iter().map(String::as_str).collect();
                            processed.retain(|id| listed.contains(id.as_str()));
                        } else if stats.processed() > 0 {
                            info!(
                                processed = stats.processed(),
                                saved = stats.saved_paths.len(),
                                "Processed new torrents"
                            );
                        }
                        processed.extend(stats.processed_ids);
                        status.known_torrents = processed.len();
                        status.last_error = None;
                        options.refresh_interval
                    }
                    Err(e) => {
                        error!(error = %e, "Watch iteration failed");
                        status.failed_iterations += 1;
                        status.last_error = Some(e.to_string());
                        options.error_backoff.max(options.refresh_interval)
                    }
                }
            };

            if !Self::pause(&mut shutdown_rx, delay).await {
                info!("Watch loop received shutdown signal");
                break;
            }
        }

        running.store(false, Ordering::SeqCst);
        status.write().await.running = false;
        info!("Watch loop stopped");
    }

    /// Sleep for `delay`. Returns false if shutdown was requested.
    async fn pause(shutdown_rx: &mut broadcast::Receiver<()>, delay: Duration) -> bool {
        tokio::select! {
            _ = shutdown_rx.recv() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
