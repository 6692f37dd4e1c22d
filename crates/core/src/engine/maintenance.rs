//! Download list housekeeping and hoster link checks.

use std::cmp::Reverse;
use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::types::EngineError;
use super::SyncEngine;
use crate::cache::parse_timestamp;
use crate::debrid::{fetch_all_downloads, Download, LinkCheck};

/// Result of a housekeeping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Downloads listed on the account.
    pub examined: usize,
    /// Downloads selected for deletion.
    pub targeted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub dry_run: bool,
}

/// Downloads superseded by a newer one for the same link.
///
/// Within each link group the newest `generated` is kept; downloads with
/// no parseable timestamp sort as oldest.
pub fn find_duplicate_downloads(downloads: &[Download]) -> Vec<&Download> {
    let mut groups: HashMap<&str, Vec<&Download>> = HashMap::new();
    for download in downloads.iter().filter(|d| !d.link.is_empty()) {
        groups.entry(download.link.as_str()).or_default().push(download);
    }

    let mut duplicates = Vec::new();
    for (_, mut group) in groups {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|d| Reverse(d.generated.as_deref().and_then(parse_timestamp)));
        duplicates.extend(group.into_iter().skip(1));
    }
    duplicates
}

impl SyncEngine {
    /// Delete downloads duplicated by a newer one for the same link.
    pub async fn remove_duplicate_downloads(
        &self,
        dry_run: bool,
    ) -> Result<MaintenanceReport, EngineError> {
        let downloads = self.fetch_downloads().await?;
        let duplicates = find_duplicate_downloads(&downloads);

        info!(
            downloads = downloads.len(),
            duplicates = duplicates.len(),
            "Duplicate scan complete"
        );

        let mut report = MaintenanceReport {
            examined: downloads.len(),
            targeted: duplicates.len(),
            dry_run,
            ..Default::default()
        };

        if dry_run {
            for download in &duplicates {
                info!(download_id = %download.id, filename = %download.filename, "Would delete duplicate");
            }
            return Ok(report);
        }

        let ids: Vec<&str> = duplicates.iter().map(|d| d.id.as_str()).collect();
        (report.deleted, report.failed) = self.delete_downloads(&ids).await;
        Ok(report)
    }

    /// Delete every download on the account.
    pub async fn clear_downloads(&self) -> Result<MaintenanceReport, EngineError> {
        let downloads = self.fetch_downloads().await?;
        let ids: Vec<&str> = downloads.iter().map(|d| d.id.as_str()).collect();

        info!(downloads = ids.len(), "Clearing downloads");

        let (deleted, failed) = self.delete_downloads(&ids).await;
        Ok(MaintenanceReport {
            examined: downloads.len(),
            targeted: ids.len(),
            deleted,
            failed,
            dry_run: false,
        })
    }

    /// Ask the service whether `link` can be unrestricted right now.
    pub async fn check_link(
        &self,
        link: &str,
        password: Option<&str>,
    ) -> Result<LinkCheck, EngineError> {
        let check = self.api.check_link(link, password).await?;
        info!(
            link = %link,
            host = check.host.as_deref().unwrap_or("unknown"),
            supported = check.is_supported(),
            "Checked hoster link"
        );
        Ok(check)
    }

    async fn fetch_downloads(&self) -> Result<Vec<Download>, EngineError> {
        Ok(fetch_all_downloads(
            self.api.as_ref(),
            self.options.page_size,
            self.options.concurrency,
        )
        .await?)
    }

    /// Returns (deleted, failed).
    async fn delete_downloads(&self, ids: &[&str]) -> (usize, usize) {
        let results: Vec<bool> = stream::iter(ids.iter().copied())
            .map(|id| {
                async move {
                    match self.api.delete_download(id).await {
                        Ok(()) => {
                            debug!(download_id = %id, "Deleted download");
                            true
                        }
                        Err(e) => {
                            warn!(download_id = %id, error = %e, "Failed to delete download");
                            false
                        }
                    }
                }
                .boxed()
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let deleted = results.iter().filter(|ok| **ok).count();
        (deleted, results.len() - deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(id: &str, link: &str, generated: Option<&str>) -> Download {
        Download {
            id: id.to_string(),
            filename: format!("{}.mkv", id),
            link: link.to_string(),
            download: Some(format!("https://cdn/{}", id)),
            generated: generated.map(str::to_string),
            streamable: 1,
            mime_type: None,
            filesize: None,
            host: None,
        }
    }

    #[test]
    fn test_keeps_newest_per_link() {
        let downloads = vec![
            download("a1", "A", Some("2024-01-01T00:00:00.000Z")),
            download("a2", "A", Some("2024-02-01T00:00:00.000Z")),
            download("a3", "A", None),
            download("b1", "B", Some("2024-01-01T00:00:00.000Z")),
        ];

        let mut ids: Vec<_> = find_duplicate_downloads(&downloads)
            .into_iter()
            .map(|d| d.id.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[test]
    fn test_no_duplicates() {
        let downloads = vec![download("a", "A", None), download("b", "B", None)];
        assert!(find_duplicate_downloads(&downloads).is_empty());
    }
}
