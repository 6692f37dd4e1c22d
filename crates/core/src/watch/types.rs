//! Types for the watch loop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;

/// Timing of the watch loop.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Pause between iterations.
    pub refresh_interval: Duration,
    /// Minimum time between full sweeps with health checks.
    pub health_check_interval: Duration,
    /// Pause after a failed iteration.
    pub error_backoff: Duration,
}

impl WatchOptions {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            refresh_interval: Duration::from_secs(config.refresh_interval_secs),
            health_check_interval: Duration::from_secs(config.health_check_interval_mins * 60),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }
}

/// Snapshot of the watch loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchStatus {
    pub running: bool,
    /// Iterations completed, successful or not.
    pub iterations: u64,
    pub full_sweeps: u64,
    pub failed_iterations: u64,
    /// Torrents processed so far and skipped by incremental sweeps.
    pub known_torrents: usize,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
