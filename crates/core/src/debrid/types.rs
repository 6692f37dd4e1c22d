//! Types for debrid API operations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during debrid API operations.
#[derive(Debug, Error)]
pub enum DebridError {
    /// HTTP 429. Retried after the server-provided delay.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Connection failures, timeouts and 5xx responses other than 503.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// HTTP 503. Never retried so callers can escalate to reinsertion.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Giving up after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl DebridError {
    /// Whether the hoster or service reported itself unavailable.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, DebridError::ServiceUnavailable(_))
    }
}

/// Remote status of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    Queued,
    Downloading,
    Downloaded,
    Dead,
    Error,
    /// Any status this tool does not act on (magnet_conversion, uploading, ...).
    #[serde(other)]
    Other,
}

impl TorrentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::Queued => "queued",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::Downloaded => "downloaded",
            TorrentStatus::Dead => "dead",
            TorrentStatus::Error => "error",
            TorrentStatus::Other => "other",
        }
    }
}

/// A torrent on the debrid account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torrent {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    /// Info hash, used to rebuild a magnet on reinsertion.
    #[serde(default)]
    pub hash: Option<String>,
    pub status: TorrentStatus,
    /// Hoster links, one per selected file, in file order.
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub added: Option<String>,
}

impl Torrent {
    /// Magnet URI rebuilt from the info hash.
    pub fn magnet_uri(&self) -> Option<String> {
        self.hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| format!("magnet:?xt=urn:btih:{}", h))
    }
}

/// An unrestricted link on the debrid account.
///
/// Also the shape returned by `/unrestrict/link`, which has no `generated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    /// Hoster link this download was generated from.
    #[serde(default)]
    pub link: String,
    /// Direct URL.
    #[serde(default)]
    pub download: Option<String>,
    #[serde(default)]
    pub generated: Option<String>,
    #[serde(default)]
    pub streamable: u8,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub host: Option<String>,
}

impl Download {
    pub fn is_streamable(&self) -> bool {
        self.streamable == 1
    }

    /// The direct URL, if present and non-empty.
    pub fn resolved_url(&self) -> Option<&str> {
        self.download.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Response of `/torrents/addMagnet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedMagnet {
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Response of `/unrestrict/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheck {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub supported: u8,
}

impl LinkCheck {
    pub fn is_supported(&self) -> bool {
        self.supported == 1
    }
}

/// Which files of a torrent to select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    All,
    Ids(Vec<u32>),
}

impl FileSelection {
    /// Form value for the `files` parameter.
    pub fn as_param(&self) -> String {
        match self {
            FileSelection::All => "all".to_string(),
            FileSelection::Ids(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Debrid REST API abstraction.
///
/// Implementations own throttling and retries; callers see one logical call.
#[async_trait]
pub trait DebridApi: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// One page of torrents (1-based). An empty page means past the end.
    async fn list_torrents(&self, page: usize, limit: usize) -> Result<Vec<Torrent>, DebridError>;

    /// One page of downloads (1-based).
    async fn list_downloads(&self, page: usize, limit: usize)
        -> Result<Vec<Download>, DebridError>;

    async fn get_torrent_info(&self, id: &str) -> Result<Torrent, DebridError>;

    async fn add_magnet(&self, magnet: &str, host: Option<&str>)
        -> Result<AddedMagnet, DebridError>;

    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError>;

    /// Convert a hoster link into a direct download.
    async fn unrestrict_link(&self, link: &str, password: Option<&str>)
        -> Result<Download, DebridError>;

    /// Check whether a hoster link can currently be unrestricted.
    async fn check_link(&self, link: &str, password: Option<&str>)
        -> Result<LinkCheck, DebridError>;

    async fn delete_download(&self, id: &str) -> Result<(), DebridError>;

    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError>;
}
