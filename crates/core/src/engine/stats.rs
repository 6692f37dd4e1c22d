use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use super::types::TorrentReport;
use crate::classify::MediaKind;

/// Aggregate counters for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub total_torrents: usize,

    pub healthy: usize,
    pub unhealthy: usize,
    pub deferred: usize,
    pub reinserted: usize,
    pub reinsertion_failures: usize,

    pub tv_processed: usize,
    pub movies_processed: usize,
    pub unknown_processed: usize,
    /// Torrents that produced nothing (not downloaded, or no links).
    pub empty: usize,
    /// Ids of torrents that went through processing successfully.
    pub processed_ids: Vec<String>,
    /// Every torrent id listed on the account. Filled by full sweeps only.
    pub account_ids: Vec<String>,

    pub saved_paths: Vec<PathBuf>,
    pub written: usize,
    pub skipped_extras: usize,
    pub skipped_samples: usize,
    pub cache_hits: usize,
    pub reused_downloads: usize,
    pub unrestricted: usize,
    pub deleted_downloads: usize,
    pub failed_links: usize,
    /// Torrents with at least one failed link.
    pub torrents_with_errors: usize,

    pub health_check_time: Duration,
    pub processing_time: Duration,
}

impl BatchStats {
    /// Fold one torrent's report into the totals.
    pub fn record(&mut self, kind: MediaKind, report: TorrentReport) {
        match kind {
            MediaKind::Episode => self.tv_processed += 1,
            MediaKind::Movie => self.movies_processed += 1,
            MediaKind::Unknown => self.unknown_processed += 1,
        }
        if report.failed_links > 0 {
            self.torrents_with_errors += 1;
        }

        self.written += report.written;
        self.skipped_extras += report.skipped_extras;
        self.skipped_samples += report.skipped_samples;
        self.cache_hits += report.cache_hits;
        self.reused_downloads += report.reused_downloads;
        self.unrestricted += report.unrestricted;
        self.deleted_downloads += report.deleted_downloads;
        self.failed_links += report.failed_links;
        self.processed_ids.push(report.torrent_id);
        self.saved_paths.extend(report.saved_paths);
    }

    pub fn processed(&self) -> usize {
        self.tv_processed + self.movies_processed + self.unknown_processed
    }

    /// End-of-run summary.
    pub fn log_summary(&self) {
        info!(
            total = self.total_torrents,
            processed = self.processed(),
            tv = self.tv_processed,
            movies = self.movies_processed,
            unknown = self.unknown_processed,
            empty = self.empty,
            "Torrents"
        );
        info!(
            healthy = self.healthy,
            unhealthy = self.unhealthy,
            deferred = self.deferred,
            reinserted = self.reinserted,
            reinsertion_failures = self.reinsertion_failures,
            "Health"
        );
        info!(
            saved = self.saved_paths.len(),
            written = self.written,
            skipped_extras = self.skipped_extras,
            skipped_samples = self.skipped_samples,
            reused_downloads = self.reused_downloads,
            cache_hits = self.cache_hits,
            unrestricted = self.unrestricted,
            deleted_downloads = self.deleted_downloads,
            failed_links = self.failed_links,
            torrents_with_errors = self.torrents_with_errors,
            "Links"
        );
        info!(
            health_check_secs = self.health_check_time.as_secs_f64(),
            processing_secs = self.processing_time.as_secs_f64(),
            "Timing"
        );
    }
}
