//! Per-torrent processing: link resolution, health and reinsertion.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::index::DownloadIndex;
use super::types::{EngineError, LinkSource, ProcessOutcome, TorrentHealth, TorrentReport};
use super::SyncEngine;
use crate::cache::{is_expired, CacheEntry, CachedLink};
use crate::classify::classify;
use crate::debrid::{DebridError, Download, FileSelection, Torrent, TorrentStatus};
use crate::library::SaveOutcome;
use crate::metrics;

/// A link with a usable direct URL, not yet written.
#[derive(Debug, Clone)]
struct ResolvedLink {
    position: usize,
    link: String,
    filename: String,
    url: String,
    streamable: u8,
    generated: Option<String>,
    source: LinkSource,
}

impl ResolvedLink {
    fn from_download(
        position: usize,
        link: &str,
        download: &Download,
        url: &str,
        generated: Option<String>,
        source: LinkSource,
    ) -> Self {
        Self {
            position,
            link: link.to_string(),
            filename: download.filename.clone(),
            url: url.to_string(),
            streamable: download.streamable,
            generated,
            source,
        }
    }

    fn from_cache(cached: &CachedLink) -> Self {
        Self {
            position: cached.position,
            link: cached.link.clone(),
            filename: cached.filename.clone(),
            url: cached.download.clone(),
            streamable: cached.streamable,
            generated: cached.generated.clone(),
            source: LinkSource::Cache,
        }
    }

    fn to_cached(&self) -> CachedLink {
        CachedLink {
            position: self.position,
            link: self.link.clone(),
            filename: self.filename.clone(),
            download: self.url.clone(),
            streamable: self.streamable,
            generated: self.generated.clone(),
        }
    }
}

enum Resolution {
    Resolved(ResolvedLink),
    Skipped,
    HosterUnavailable,
}

/// Health of a torrent from its status alone.
pub fn check_torrent_health(torrent: &Torrent) -> TorrentHealth {
    match torrent.status {
        TorrentStatus::Downloaded => TorrentHealth::Healthy,
        TorrentStatus::Dead => TorrentHealth::Dead,
        _ => TorrentHealth::Deferred,
    }
}

impl SyncEngine {
    /// Resolve every link of `torrent` and write its reference files.
    ///
    /// Links are resolved first and written only once all of them are
    /// known, so a hoster outage on any link leaves the library untouched.
    pub async fn process_single_torrent(
        &self,
        torrent: &Torrent,
        index: &DownloadIndex,
    ) -> ProcessOutcome {
        if torrent.status != TorrentStatus::Downloaded {
            debug!(torrent_id = %torrent.id, status = torrent.status.as_str(), "Skipping torrent");
            return ProcessOutcome::Empty;
        }
        if torrent.links.is_empty() {
            debug!(torrent_id = %torrent.id, "Torrent has no links");
            return ProcessOutcome::Empty;
        }

        let now = Utc::now();
        let cached = match &self.cache {
            Some(cache) => cache.read(&torrent.id).await,
            None => None,
        };
        // An entry with any expired link is regenerated in full
        let cached = cached.filter(|entry| {
            let fresh = entry.is_fresh(now);
            if !fresh {
                debug!(torrent_id = %torrent.id, "Cache entry expired");
            }
            fresh
        });
        let mut report = TorrentReport::new(torrent);

        let mut resolved = Vec::with_capacity(torrent.links.len());
        for (position, link) in torrent.links.iter().enumerate() {
            match self
                .resolve_link(torrent, position, link, index, cached.as_ref(), now, &mut report)
                .await
            {
                Resolution::Resolved(hit) => resolved.push(hit),
                Resolution::Skipped => {}
                Resolution::HosterUnavailable => {
                    return ProcessOutcome::NeedsReinsertion(torrent.clone())
                }
            }
        }

        let entry = self.write_links(torrent, resolved, now, &mut report).await;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(&torrent.id, &entry).await {
                warn!(torrent_id = %torrent.id, error = %e, "Failed to update link cache");
            }
        }

        info!(
            torrent_id = %torrent.id,
            filename = %torrent.filename,
            saved = report.saved_paths.len(),
            written = report.written,
            failed = report.failed_links,
            "Processed torrent"
        );
        ProcessOutcome::Saved(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_link(
        &self,
        torrent: &Torrent,
        position: usize,
        link: &str,
        index: &DownloadIndex,
        cached: Option<&CacheEntry>,
        now: DateTime<Utc>,
        report: &mut TorrentReport,
    ) -> Resolution {
        if let Some(existing) = index.get(link) {
            if let Some(url) = existing.resolved_url() {
                if !is_expired(existing.generated.as_deref(), None, now) {
                    report.reused_downloads += 1;
                    return Resolution::Resolved(ResolvedLink::from_download(
                        position,
                        link,
                        existing,
                        url,
                        existing.generated.clone(),
                        LinkSource::Download,
                    ));
                }
                debug!(torrent_id = %torrent.id, download_id = %existing.id, "Existing download expired");
                self.delete_download(&existing.id, report).await;
            }
        }

        if let Some(hit) = cached.and_then(|entry| entry.fresh_link(position, link, now)) {
            report.cache_hits += 1;
            return Resolution::Resolved(ResolvedLink::from_cache(hit));
        }

        let download = match self.api.unrestrict_link(link, None).await {
            Ok(download) => download,
            Err(e) if e.is_service_unavailable() => {
                warn!(
                    torrent_id = %torrent.id,
                    position,
                    error = %e,
                    "Hoster unavailable, torrent needs reinsertion"
                );
                return Resolution::HosterUnavailable;
            }
            Err(e) => {
                warn!(torrent_id = %torrent.id, position, error = %e, "Failed to unrestrict link");
                report.failed_links += 1;
                return Resolution::Skipped;
            }
        };

        match download.resolved_url() {
            Some(url) if download.is_streamable() => {
                report.unrestricted += 1;
                // Unrestrict responses carry no generation time
                let generated = download
                    .generated
                    .clone()
                    .or_else(|| Some(now.to_rfc3339()));
                Resolution::Resolved(ResolvedLink::from_download(
                    position,
                    link,
                    &download,
                    url,
                    generated,
                    LinkSource::Unrestrict,
                ))
            }
            _ => {
                warn!(
                    torrent_id = %torrent.id,
                    position,
                    filename = %download.filename,
                    "Unrestricted link is not streamable"
                );
                if !download.id.is_empty() {
                    self.delete_download(&download.id, report).await;
                }
                report.failed_links += 1;
                Resolution::Skipped
            }
        }
    }

    /// Write every resolved link and return the cache entry for this run.
    ///
    /// The entry holds only the links resolved now; records of links that
    /// failed are not carried over.
    async fn write_links(
        &self,
        torrent: &Torrent,
        resolved: Vec<ResolvedLink>,
        now: DateTime<Utc>,
        report: &mut TorrentReport,
    ) -> CacheEntry {
        let numbered = torrent.links.len() > 1;
        let mut entry = CacheEntry::new(now);

        for link in resolved {
            metrics::LINKS_RESOLVED
                .with_label_values(&[link.source.as_str()])
                .inc();
            entry.upsert(link.to_cached());

            let filename = if link.filename.is_empty() {
                torrent.filename.as_str()
            } else {
                link.filename.as_str()
            };
            let classified = classify(filename);
            if classified.is_sample {
                debug!(torrent_id = %torrent.id, filename = %filename, "Skipping sample");
                report.skipped_samples += 1;
                continue;
            }

            let index = numbered.then_some(link.position);
            match self
                .writer
                .save_classified(filename, &classified, &link.url, index)
                .await
            {
                Ok(SaveOutcome::Written(path)) => {
                    report.written += 1;
                    report.saved_paths.push(path);
                }
                Ok(SaveOutcome::Unchanged(path)) | Ok(SaveOutcome::Duplicate { existing: path }) => {
                    report.saved_paths.push(path);
                }
                Ok(SaveOutcome::SkippedExtra) => report.skipped_extras += 1,
                Ok(SaveOutcome::SkippedSample) => report.skipped_samples += 1,
                Err(e) => {
                    warn!(torrent_id = %torrent.id, filename = %filename, error = %e, "Failed to write reference file");
                    report.failed_links += 1;
                }
            }
        }

        entry.saved_files = report.saved_paths.clone();
        entry.skipped_extras = report.skipped_extras;
        entry
    }

    async fn delete_download(&self, download_id: &str, report: &mut TorrentReport) {
        match self.api.delete_download(download_id).await {
            Ok(()) => report.deleted_downloads += 1,
            Err(e) => {
                warn!(download_id = %download_id, error = %e, "Failed to delete download");
            }
        }
    }

    /// Delete a dead torrent and add it again from its info hash.
    ///
    /// Returns the new torrent as the service now reports it.
    pub async fn reinsert_dead_torrent(&self, torrent: &Torrent) -> Result<Torrent, EngineError> {
        let result = self.try_reinsert(torrent).await;
        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::REINSERTIONS.with_label_values(&[label]).inc();
        result
    }

    async fn try_reinsert(&self, torrent: &Torrent) -> Result<Torrent, EngineError> {
        let magnet = torrent
            .magnet_uri()
            .ok_or_else(|| EngineError::MissingHash {
                torrent_id: torrent.id.clone(),
            })?;

        let step = |step: &'static str| {
            let torrent_id = torrent.id.clone();
            move |source: DebridError| EngineError::Reinsertion {
                torrent_id,
                step,
                source,
            }
        };

        self.api
            .delete_torrent(&torrent.id)
            .await
            .map_err(step("delete"))?;
        let added = self
            .api
            .add_magnet(&magnet, None)
            .await
            .map_err(step("add_magnet"))?;
        self.api
            .select_files(&added.id, &FileSelection::All)
            .await
            .map_err(step("select_files"))?;
        let fresh = self
            .api
            .get_torrent_info(&added.id)
            .await
            .map_err(step("torrent_info"))?;

        info!(
            old_id = %torrent.id,
            new_id = %fresh.id,
            filename = %torrent.filename,
            "Reinserted dead torrent"
        );
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(status: TorrentStatus) -> Torrent {
        Torrent {
            id: "T".to_string(),
            filename: "Show.S01E01.mkv".to_string(),
            hash: None,
            status,
            links: vec![],
            bytes: None,
            added: None,
        }
    }

    #[test]
    fn test_health_from_status() {
        assert_eq!(
            check_torrent_health(&torrent(TorrentStatus::Downloaded)),
            TorrentHealth::Healthy
        );
        assert_eq!(
            check_torrent_health(&torrent(TorrentStatus::Dead)),
            TorrentHealth::Dead
        );
        for status in [
            TorrentStatus::Queued,
            TorrentStatus::Downloading,
            TorrentStatus::Error,
            TorrentStatus::Other,
        ] {
            assert_eq!(check_torrent_health(&torrent(status)), TorrentHealth::Deferred);
        }
    }
}
