//! Testing utilities and mock implementations.
//!
//! Provides an in-memory debrid account so the engine and the watch loop
//! can be exercised end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use strmsync_core::testing::{fixtures, MockDebridClient};
//!
//! let api = MockDebridClient::new();
//! api.add_torrent(fixtures::torrent("T1", "Show.S01E01.mkv", TorrentStatus::Downloaded, &["L1"])).await;
//! api.set_link_file("L1", "Show.S01E01.1080p.mkv").await;
//! ```

mod mock_debrid_client;

pub use mock_debrid_client::{MockCall, MockDebridClient, MockFailure};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeDelta, Utc};

    use crate::debrid::{Download, Torrent, TorrentStatus};

    /// Torrent with the given links and no info hash.
    pub fn torrent(id: &str, filename: &str, status: TorrentStatus, links: &[&str]) -> Torrent {
        Torrent {
            id: id.to_string(),
            filename: filename.to_string(),
            hash: None,
            status,
            links: links.iter().map(|l| l.to_string()).collect(),
            bytes: Some(1024 * 1024 * 700),
            added: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Dead torrent that can be reinserted from `hash`.
    pub fn dead_torrent(id: &str, filename: &str, hash: &str, links: &[&str]) -> Torrent {
        Torrent {
            hash: Some(hash.to_string()),
            ..torrent(id, filename, TorrentStatus::Dead, links)
        }
    }

    /// Streamable download of `link`, generated at `generated`.
    pub fn download(id: &str, link: &str, filename: &str, generated: DateTime<Utc>) -> Download {
        Download {
            id: id.to_string(),
            filename: filename.to_string(),
            link: link.to_string(),
            download: Some(format!("https://cdn.mock/{}", id)),
            generated: Some(generated.to_rfc3339()),
            streamable: 1,
            mime_type: Some("video/x-matroska".to_string()),
            filesize: Some(1024),
            host: Some("mock.host".to_string()),
        }
    }

    /// Timestamp `days` days ago.
    pub fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - TimeDelta::days(days)
    }
}
