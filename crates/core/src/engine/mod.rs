//! Torrent reconciliation engine.
//!
//! Drives a sweep over the debrid account:
//! - Fetch: every torrent and download, paged concurrently
//! - Health: dead torrents are reinserted from their info hash
//! - Process: per-bucket worker pools resolve links and write reference files
//! - Repair: torrents whose hoster went away are reinserted and processed once more

mod batch;
mod index;
mod maintenance;
mod stats;
mod torrent;
mod types;

pub use batch::workers_for;
pub use index::DownloadIndex;
pub use maintenance::{find_duplicate_downloads, MaintenanceReport};
pub use stats::BatchStats;
pub use torrent::check_torrent_health;
pub use types::{
    EngineError, EngineOptions, LinkSource, ProcessOutcome, SweepMode, TorrentHealth,
    TorrentReport,
};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::cache::{JsonFileLinkCache, LinkCache};
use crate::config::Config;
use crate::debrid::{fetch_all_downloads, fetch_all_torrents, DebridApi, TorrentStatus};
use crate::library::{LibraryOptions, LibraryWriter};
use crate::metrics;

/// Reconciles a debrid account with a local library.
pub struct SyncEngine {
    api: Arc<dyn DebridApi>,
    writer: LibraryWriter,
    cache: Option<Arc<dyn LinkCache>>,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn DebridApi>,
        writer: LibraryWriter,
        cache: Option<Arc<dyn LinkCache>>,
        options: EngineOptions,
    ) -> Self {
        Self {
            api,
            writer,
            cache,
            options,
        }
    }

    /// Engine wired from configuration, with the JSON file cache when enabled.
    pub fn from_config(api: Arc<dyn DebridApi>, config: &Config) -> Self {
        let writer = LibraryWriter::new(
            config.library.output_dir.clone(),
            LibraryOptions {
                skip_extras: config.library.skip_extras,
            },
        );
        let cache: Option<Arc<dyn LinkCache>> = if config.cache.enabled {
            Some(Arc::new(JsonFileLinkCache::new(config.cache.dir.clone())))
        } else {
            None
        };
        Self::new(api, writer, cache, EngineOptions::from_config(config))
    }

    /// Turn the health phase of full sweeps on or off.
    pub fn with_health_check(mut self, enabled: bool) -> Self {
        self.options.health_check = enabled;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn writer(&self) -> &LibraryWriter {
        &self.writer
    }

    /// One sweep over the account.
    pub async fn run_once(&self, mode: SweepMode<'_>) -> Result<BatchStats, EngineError> {
        let started = Instant::now();
        let torrents =
            fetch_all_torrents(self.api.as_ref(), self.options.page_size, self.options.concurrency)
                .await?;
        let fetched = torrents.len();
        let account_ids: Vec<String> = match mode {
            SweepMode::Full => torrents.iter().map(|t| t.id.clone()).collect(),
            SweepMode::NewOnly(_) => Vec::new(),
        };

        let (torrents, health_check) = match mode {
            SweepMode::Full => (torrents, self.options.health_check),
            // Only finished torrents are worth a download listing between full sweeps
            SweepMode::NewOnly(seen) => (
                torrents
                    .into_iter()
                    .filter(|t| t.status == TorrentStatus::Downloaded && !seen.contains(&t.id))
                    .collect::<Vec<_>>(),
                false,
            ),
        };

        if torrents.is_empty() {
            debug!(fetched, "No torrents to process");
            return Ok(BatchStats {
                account_ids,
                ..Default::default()
            });
        }

        let downloads =
            fetch_all_downloads(self.api.as_ref(), self.options.page_size, self.options.concurrency)
                .await?;
        metrics::PHASE_DURATION
            .with_label_values(&["fetch"])
            .observe(started.elapsed().as_secs_f64());

        info!(
            fetched,
            selected = torrents.len(),
            downloads = downloads.len(),
            "Fetched account state"
        );

        let mut stats = self
            .process_torrents_concurrent(torrents, &downloads, health_check)
            .await;
        stats.account_ids = account_ids;
        Ok(stats)
    }
}
