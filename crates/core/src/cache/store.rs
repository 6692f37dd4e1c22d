use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::types::{CacheEntry, CacheError};

/// Per-torrent store of resolved links.
///
/// Reads never fail: anything missing or unreadable is a miss.
#[async_trait]
pub trait LinkCache: Send + Sync {
    async fn has(&self, torrent_id: &str) -> bool;

    async fn read(&self, torrent_id: &str) -> Option<CacheEntry>;

    async fn write(&self, torrent_id: &str, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// One JSON file per torrent, named by the MD5 of its id.
pub struct JsonFileLinkCache {
    dir: PathBuf,
}

impl JsonFileLinkCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `torrent_id`.
    pub fn path_for(&self, torrent_id: &str) -> PathBuf {
        let key = format!("{:x}", md5::compute(torrent_id.as_bytes()));
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl LinkCache for JsonFileLinkCache {
    async fn has(&self, torrent_id: &str) -> bool {
        fs::try_exists(self.path_for(torrent_id))
            .await
            .unwrap_or(false)
    }

    async fn read(&self, torrent_id: &str) -> Option<CacheEntry> {
        let path = self.path_for(torrent_id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(torrent_id = %torrent_id, path = %path.display(), error = %e, "Unreadable cache file");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(torrent_id = %torrent_id, path = %path.display(), error = %e, "Corrupt cache file, ignoring");
                None
            }
        }
    }

    async fn write(&self, torrent_id: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(torrent_id);
        let json = serde_json::to_vec_pretty(entry)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        // Write then rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|source| CacheError::Io {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(torrent_id = %torrent_id, links = entry.links.len(), "Cache entry written");
        Ok(())
    }
}
