//! Cache entry types and freshness rules.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debrid::Download;

/// Direct links stop working after this long.
pub const LINK_LIFETIME_DAYS: i64 = 6;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to write cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One resolved link of a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLink {
    /// Index of the link within the torrent.
    pub position: usize,
    /// Hoster link.
    pub link: String,
    #[serde(default)]
    pub filename: String,
    /// Direct URL.
    pub download: String,
    #[serde(default)]
    pub streamable: u8,
    /// Remote generation timestamp, when the service reported one.
    #[serde(default)]
    pub generated: Option<String>,
}

impl CachedLink {
    /// Build from a resolved download. `None` when it carries no direct URL.
    pub fn from_download(position: usize, link: &str, download: &Download) -> Option<Self> {
        Some(Self {
            position,
            link: link.to_string(),
            filename: download.filename.clone(),
            download: download.resolved_url()?.to_string(),
            streamable: download.streamable,
            generated: download.generated.clone(),
        })
    }
}

/// Everything remembered about one torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub links: Vec<CachedLink>,
    #[serde(default, rename = "savedFiles")]
    pub saved_files: Vec<PathBuf>,
    #[serde(default, rename = "skippedExtras")]
    pub skipped_extras: usize,
    #[serde(default, rename = "cachedDate")]
    pub cached_date: Option<String>,
}

impl CacheEntry {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            cached_date: Some(now.to_rfc3339()),
            ..Default::default()
        }
    }

    /// Cached link at `position` for the same hoster link.
    pub fn link_at(&self, position: usize, link: &str) -> Option<&CachedLink> {
        self.links
            .iter()
            .find(|l| l.position == position && l.link == link)
    }

    /// A fresh cached link at `position`, if any.
    pub fn fresh_link(&self, position: usize, link: &str, now: DateTime<Utc>) -> Option<&CachedLink> {
        self.link_at(position, link).filter(|cached| {
            !is_expired(
                cached.generated.as_deref(),
                self.cached_date.as_deref(),
                now,
            )
        })
    }

    /// True only while every contained link is unexpired.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        if self.links.is_empty() {
            return !is_expired(None, self.cached_date.as_deref(), now);
        }
        self.links.iter().all(|cached| {
            !is_expired(
                cached.generated.as_deref(),
                self.cached_date.as_deref(),
                now,
            )
        })
    }

    /// Insert or replace the link at its position, keeping positions sorted.
    pub fn upsert(&mut self, cached: CachedLink) {
        self.links.retain(|l| l.position != cached.position);
        let at = self
            .links
            .partition_point(|l| l.position < cached.position);
        self.links.insert(at, cached);
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Whether a link generated at `generated` (else cached at `cached`) has expired.
///
/// Unparseable or missing timestamps count as expired.
pub fn is_expired(generated: Option<&str>, cached: Option<&str>, now: DateTime<Utc>) -> bool {
    let stamp = generated
        .and_then(parse_timestamp)
        .or_else(|| cached.and_then(parse_timestamp));

    match stamp {
        Some(stamp) => now - stamp >= TimeDelta::days(LINK_LIFETIME_DAYS),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ago(now: DateTime<Utc>, days: i64) -> String {
        (now - TimeDelta::days(days)).to_rfc3339()
    }

    #[test]
    fn test_freshness_boundaries() {
        let now = Utc::now();
        assert!(!is_expired(Some(&ago(now, 5)), None, now));
        assert!(is_expired(Some(&ago(now, 6)), None, now));
        assert!(is_expired(None, None, now));
    }

    #[test]
    fn test_falls_back_to_cache_date() {
        let now = Utc::now();
        assert!(!is_expired(None, Some(&ago(now, 1)), now));
        assert!(is_expired(Some("garbage"), Some(&ago(now, 7)), now));
        assert!(is_expired(Some("garbage"), Some("also garbage"), now));
    }

    #[test]
    fn test_parse_naive_and_rfc3339() {
        let rfc = parse_timestamp("2024-03-01T10:00:00.000Z").unwrap();
        let naive = parse_timestamp("2024-03-01T10:00:00").unwrap();
        let spaced = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(rfc, naive);
        assert_eq!(naive, spaced);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_entry_freshness_requires_every_link() {
        let now = Utc::now();
        let mut entry = CacheEntry::new(now);
        entry.upsert(CachedLink {
            position: 0,
            link: "https://hoster/a".to_string(),
            filename: "a.mkv".to_string(),
            download: "https://cdn/a".to_string(),
            streamable: 1,
            generated: Some(ago(now, 1)),
        });
        assert!(entry.is_fresh(now));

        entry.upsert(CachedLink {
            position: 1,
            link: "https://hoster/b".to_string(),
            filename: "b.mkv".to_string(),
            download: "https://cdn/b".to_string(),
            streamable: 1,
            generated: Some(ago(now, 8)),
        });
        assert!(!entry.is_fresh(now));
        assert!(entry.fresh_link(0, "https://hoster/a", now).is_some());
        assert!(entry.fresh_link(1, "https://hoster/b", now).is_none());
        assert!(entry.fresh_link(0, "https://hoster/other", now).is_none());
    }

    #[test]
    fn test_upsert_keeps_position_order() {
        let mut entry = CacheEntry::default();
        for position in [2, 0, 1, 0] {
            entry.upsert(CachedLink {
                position,
                link: format!("l{}", position),
                filename: String::new(),
                download: format!("d{}", position),
                streamable: 1,
                generated: None,
            });
        }
        let positions: Vec<_> = entry.links.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_wire_field_names() {
        let entry = CacheEntry::new(Utc::now());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"savedFiles\""));
        assert!(json.contains("\"cachedDate\""));
    }
}
