//! Batch orchestration across worker pools.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::index::DownloadIndex;
use super::stats::BatchStats;
use super::torrent::check_torrent_health;
use super::types::{EngineError, ProcessOutcome, TorrentHealth};
use super::SyncEngine;
use crate::classify::{precategorize, MediaKind};
use crate::debrid::{Download, Torrent};
use crate::metrics;

/// Share of the worker budget given to each bucket.
const TV_SHARE: f64 = 0.7;
const MOVIE_SHARE: f64 = 0.3;
const UNKNOWN_SHARE: f64 = 0.5;

/// Workers for a bucket of `bucket_len` torrents: at least 1, at most the bucket size.
pub fn workers_for(bucket_len: usize, concurrency: usize, share: f64) -> usize {
    if bucket_len == 0 {
        return 1;
    }
    let budget = (concurrency as f64 * share).floor() as usize;
    budget.min(bucket_len).max(1)
}

fn share_for(kind: MediaKind) -> f64 {
    match kind {
        MediaKind::Episode => TV_SHARE,
        MediaKind::Movie => MOVIE_SHARE,
        MediaKind::Unknown => UNKNOWN_SHARE,
    }
}

impl SyncEngine {
    /// Health-check, repair and process a batch of torrents.
    ///
    /// Per-torrent failures are folded into the returned stats; nothing
    /// here aborts the batch.
    pub async fn process_torrents_concurrent(
        &self,
        torrents: Vec<Torrent>,
        downloads: &[Download],
        health_check: bool,
    ) -> BatchStats {
        let mut stats = BatchStats {
            total_torrents: torrents.len(),
            ..Default::default()
        };
        let index = DownloadIndex::new(downloads);

        let candidates = if health_check {
            let started = Instant::now();
            let candidates = self.health_phase(torrents, &mut stats).await;
            stats.health_check_time = started.elapsed();
            metrics::PHASE_DURATION
                .with_label_values(&["health_check"])
                .observe(stats.health_check_time.as_secs_f64());
            candidates
        } else {
            torrents
        };

        let started = Instant::now();

        let mut tv = Vec::new();
        let mut movies = Vec::new();
        let mut unknown = Vec::new();
        for torrent in candidates {
            match precategorize(&torrent.filename) {
                MediaKind::Episode => tv.push(torrent),
                MediaKind::Movie => movies.push(torrent),
                MediaKind::Unknown => unknown.push(torrent),
            }
        }

        let mut needs_reinsertion = Vec::new();
        for (kind, bucket) in [
            (MediaKind::Episode, tv),
            (MediaKind::Movie, movies),
            (MediaKind::Unknown, unknown),
        ] {
            if bucket.is_empty() {
                continue;
            }
            let workers = workers_for(bucket.len(), self.options.concurrency, share_for(kind));
            info!(
                bucket = kind.as_str(),
                torrents = bucket.len(),
                workers,
                "Processing bucket"
            );

            let index = &index;
            let outcomes: Vec<ProcessOutcome> = stream::iter(
                bucket
                    .iter()
                    .map(|torrent| self.process_single_torrent(torrent, index).boxed())
                    .collect::<Vec<_>>(),
            )
                .buffer_unordered(workers)
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    ProcessOutcome::Saved(report) => stats.record(kind, report),
                    ProcessOutcome::NeedsReinsertion(torrent) => needs_reinsertion.push(torrent),
                    ProcessOutcome::Empty => stats.empty += 1,
                }
            }
        }

        if !needs_reinsertion.is_empty() {
            self.repair_phase(needs_reinsertion, &index, &mut stats).await;
        }

        stats.processing_time = started.elapsed();
        metrics::PHASE_DURATION
            .with_label_values(&["process"])
            .observe(stats.processing_time.as_secs_f64());
        stats
    }

    /// Sort torrents by health and reinsert the dead ones.
    ///
    /// Returns the torrents to process: healthy ones plus successful reinsertions.
    async fn health_phase(&self, torrents: Vec<Torrent>, stats: &mut BatchStats) -> Vec<Torrent> {
        let mut healthy = Vec::with_capacity(torrents.len());
        let mut dead = Vec::new();

        for torrent in torrents {
            match check_torrent_health(&torrent) {
                TorrentHealth::Healthy => {
                    stats.healthy += 1;
                    healthy.push(torrent);
                }
                TorrentHealth::Dead => {
                    stats.unhealthy += 1;
                    dead.push(torrent);
                }
                TorrentHealth::Deferred => {
                    debug!(torrent_id = %torrent.id, status = torrent.status.as_str(), "Deferring torrent");
                    stats.deferred += 1;
                }
            }
        }

        info!(
            healthy = stats.healthy,
            dead = stats.unhealthy,
            deferred = stats.deferred,
            "Health check complete"
        );

        if dead.is_empty() {
            return healthy;
        }
        if !self.options.repair_enabled {
            info!(dead = dead.len(), "Repair disabled, leaving dead torrents");
            return healthy;
        }

        let results: Vec<Result<Torrent, EngineError>> = stream::iter(
            dead.iter()
                .map(|torrent| self.reinsert_dead_torrent(torrent).boxed())
                .collect::<Vec<_>>(),
        )
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(fresh) => {
                    stats.reinserted += 1;
                    healthy.push(fresh);
                }
                Err(e) => {
                    warn!(error = %e, "Reinsertion failed");
                    stats.reinsertion_failures += 1;
                }
            }
        }

        healthy
    }

    /// Reinsert torrents whose hoster was unavailable and process each once more.
    async fn repair_phase(
        &self,
        torrents: Vec<Torrent>,
        index: &DownloadIndex,
        stats: &mut BatchStats,
    ) {
        if !self.options.repair_enabled {
            warn!(
                torrents = torrents.len(),
                "Hoster unavailable for some torrents and repair is disabled"
            );
            stats.torrents_with_errors += torrents.len();
            return;
        }

        info!(torrents = torrents.len(), "Reinserting torrents with unavailable hosters");

        let results: Vec<_> = stream::iter(torrents.iter().map(|torrent| {
            async move {
                let kind = precategorize(&torrent.filename);
                match self.reinsert_dead_torrent(torrent).await {
                    Ok(fresh) => (kind, Ok(self.process_single_torrent(&fresh, index).await)),
                    Err(e) => (kind, Err(e)),
                }
            }
            .boxed()
        }).collect::<Vec<_>>())
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (kind, result) in results {
            match result {
                Ok(outcome) => {
                    stats.reinserted += 1;
                    match outcome {
                        ProcessOutcome::Saved(report) => stats.record(kind, report),
                        ProcessOutcome::NeedsReinsertion(torrent) => {
                            warn!(torrent_id = %torrent.id, "Hoster still unavailable after reinsertion");
                            stats.torrents_with_errors += 1;
                        }
                        ProcessOutcome::Empty => stats.empty += 1,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Reinsertion failed");
                    stats.reinsertion_failures += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workers_for() {
        assert_eq!(workers_for(0, 32, TV_SHARE), 1);
        assert_eq!(workers_for(100, 32, TV_SHARE), 22);
        assert_eq!(workers_for(100, 32, MOVIE_SHARE), 9);
        assert_eq!(workers_for(100, 32, UNKNOWN_SHARE), 16);
        assert_eq!(workers_for(5, 32, TV_SHARE), 5);
        assert_eq!(workers_for(10, 1, MOVIE_SHARE), 1);
    }
}
