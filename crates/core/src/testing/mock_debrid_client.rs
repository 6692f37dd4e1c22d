//! Mock debrid client for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::debrid::{
    AddedMagnet, DebridApi, DebridError, Download, FileSelection, LinkCheck, Torrent,
    TorrentStatus,
};

/// A recorded API call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListTorrents { page: usize },
    ListDownloads { page: usize },
    TorrentInfo(String),
    AddMagnet(String),
    SelectFiles { id: String, files: String },
    Unrestrict(String),
    CheckLink(String),
    DeleteDownload(String),
    DeleteTorrent(String),
}

/// Failure to inject for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// HTTP 503, hoster down.
    ServiceUnavailable,
    /// Retries exhausted.
    Transient,
    /// A plain API error with this status.
    Api(u16),
    /// Succeeds but the result is not streamable.
    NotStreamable,
}

impl MockFailure {
    /// The error unrestrict returns, if this failure is an error at all.
    fn to_error(self, link: &str) -> Option<DebridError> {
        match self {
            MockFailure::ServiceUnavailable => Some(DebridError::ServiceUnavailable(format!(
                "hoster_unavailable: {}",
                link
            ))),
            MockFailure::Transient => Some(DebridError::MaxRetriesExceeded {
                attempts: 5,
                last_error: "connection reset".to_string(),
            }),
            MockFailure::Api(status) => Some(DebridError::Api {
                status,
                message: format!("mock error for {}", link),
            }),
            MockFailure::NotStreamable => None,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    torrents: Vec<Torrent>,
    downloads: Vec<Download>,
    /// Deleted torrents, resurrected when their hash is added again.
    graveyard: Vec<Torrent>,
    link_files: HashMap<String, String>,
    link_failures: HashMap<String, MockFailure>,
    fail_add_magnet: bool,
    fail_listing: bool,
    calls: Vec<MockCall>,
    counter: u32,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}{}", prefix, self.counter)
    }
}

/// Mock implementation of the DebridApi trait.
///
/// Holds torrents and downloads in memory and records every call:
/// - Unrestricting a link creates a download on the account
/// - Per-link failures can be injected (503, transient, non-streamable)
/// - Adding the magnet of a deleted torrent brings it back under a new id,
///   already downloaded, with fresh links
///
/// # Example
///
/// ```rust,ignore
/// let api = MockDebridClient::new();
/// api.add_torrent(fixtures::torrent("T1", "Show.S01E01.mkv", TorrentStatus::Downloaded, &["L1"])).await;
/// api.fail_link("L1", MockFailure::ServiceUnavailable).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDebridClient {
    state: Arc<RwLock<MockState>>,
}

impl MockDebridClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_torrent(&self, torrent: Torrent) {
        self.state.write().await.torrents.push(torrent);
    }

    pub async fn add_download(&self, download: Download) {
        self.state.write().await.downloads.push(download);
    }

    /// Filename reported when `link` is unrestricted.
    pub async fn set_link_file(&self, link: &str, filename: &str) {
        self.state
            .write()
            .await
            .link_files
            .insert(link.to_string(), filename.to_string());
    }

    pub async fn fail_link(&self, link: &str, failure: MockFailure) {
        self.state
            .write()
            .await
            .link_failures
            .insert(link.to_string(), failure);
    }

    pub async fn set_fail_add_magnet(&self, fail: bool) {
        self.state.write().await.fail_add_magnet = fail;
    }

    /// Make torrent and download listings fail as if the service were unreachable.
    pub async fn set_fail_listing(&self, fail: bool) {
        self.state.write().await.fail_listing = fail;
    }

    pub async fn torrents(&self) -> Vec<Torrent> {
        self.state.read().await.torrents.clone()
    }

    pub async fn downloads(&self) -> Vec<Download> {
        self.state.read().await.downloads.clone()
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    /// Links passed to unrestrict, in call order.
    pub async fn unrestricted_links(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Unrestrict(link) => Some(link),
                _ => None,
            })
            .collect()
    }

    pub async fn deleted_downloads(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                MockCall::DeleteDownload(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub async fn deleted_torrents(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                MockCall::DeleteTorrent(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

fn page_of<T: Clone>(items: &[T], page: usize, limit: usize) -> Vec<T> {
    let start = page.saturating_sub(1) * limit;
    items.iter().skip(start).take(limit).cloned().collect()
}

fn not_found(what: &str, id: &str) -> DebridError {
    DebridError::Api {
        status: 404,
        message: format!("unknown {} {}", what, id),
    }
}

#[async_trait]
impl DebridApi for MockDebridClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(&self, page: usize, limit: usize) -> Result<Vec<Torrent>, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::ListTorrents { page });
        if state.fail_listing {
            return Err(DebridError::Transient("connection refused".to_string()));
        }
        Ok(page_of(&state.torrents, page, limit))
    }

    async fn list_downloads(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<Vec<Download>, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::ListDownloads { page });
        if state.fail_listing {
            return Err(DebridError::Transient("connection refused".to_string()));
        }
        Ok(page_of(&state.downloads, page, limit))
    }

    async fn get_torrent_info(&self, id: &str) -> Result<Torrent, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::TorrentInfo(id.to_string()));
        state
            .torrents
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found("torrent", id))
    }

    async fn add_magnet(
        &self,
        magnet: &str,
        _host: Option<&str>,
    ) -> Result<AddedMagnet, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::AddMagnet(magnet.to_string()));
        if state.fail_add_magnet {
            return Err(DebridError::Api {
                status: 400,
                message: "invalid magnet".to_string(),
            });
        }

        let hash = magnet
            .strip_prefix("magnet:?xt=urn:btih:")
            .unwrap_or(magnet)
            .to_string();
        let id = state.next_id("R");

        let revived = state
            .graveyard
            .iter()
            .find(|t| t.hash.as_deref() == Some(hash.as_str()))
            .cloned();

        let torrent = match revived {
            Some(old) => {
                let links: Vec<String> = old
                    .links
                    .iter()
                    .map(|link| format!("{}-{}", link, id))
                    .collect();
                for (old_link, new_link) in old.links.iter().zip(&links) {
                    if let Some(file) = state.link_files.get(old_link).cloned() {
                        state.link_files.insert(new_link.clone(), file);
                    }
                }
                Torrent {
                    id: id.clone(),
                    status: TorrentStatus::Downloaded,
                    links,
                    ..old
                }
            }
            None => Torrent {
                id: id.clone(),
                filename: String::new(),
                hash: Some(hash),
                status: TorrentStatus::Queued,
                links: Vec::new(),
                bytes: None,
                added: Some(Utc::now().to_rfc3339()),
            },
        };
        state.torrents.push(torrent);

        Ok(AddedMagnet {
            uri: Some(format!("https://api.mock/torrents/info/{}", id)),
            id,
        })
    }

    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::SelectFiles {
            id: id.to_string(),
            files: files.as_param(),
        });
        if state.torrents.iter().any(|t| t.id == id) {
            Ok(())
        } else {
            Err(not_found("torrent", id))
        }
    }

    async fn unrestrict_link(
        &self,
        link: &str,
        _password: Option<&str>,
    ) -> Result<Download, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::Unrestrict(link.to_string()));

        let failure = state.link_failures.get(link).copied();
        if let Some(error) = failure.and_then(|f| f.to_error(link)) {
            return Err(error);
        }

        let id = state.next_id("D");
        let filename = state
            .link_files
            .get(link)
            .cloned()
            .unwrap_or_else(|| format!("{}.mkv", id));
        let download = Download {
            id: id.clone(),
            filename,
            link: link.to_string(),
            download: Some(format!("https://cdn.mock/{}", id)),
            generated: Some(Utc::now().to_rfc3339()),
            streamable: if failure == Some(MockFailure::NotStreamable) {
                0
            } else {
                1
            },
            mime_type: Some("video/x-matroska".to_string()),
            filesize: Some(1024),
            host: Some("mock.host".to_string()),
        };
        state.downloads.push(download.clone());
        Ok(download)
    }

    async fn check_link(
        &self,
        link: &str,
        _password: Option<&str>,
    ) -> Result<LinkCheck, DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::CheckLink(link.to_string()));
        let supported = !matches!(
            state.link_failures.get(link),
            Some(MockFailure::ServiceUnavailable)
        );
        Ok(LinkCheck {
            host: Some("mock.host".to_string()),
            link: link.to_string(),
            filename: state.link_files.get(link).cloned(),
            filesize: None,
            supported: u8::from(supported),
        })
    }

    async fn delete_download(&self, id: &str) -> Result<(), DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::DeleteDownload(id.to_string()));
        let before = state.downloads.len();
        state.downloads.retain(|d| d.id != id);
        if state.downloads.len() < before {
            Ok(())
        } else {
            Err(not_found("download", id))
        }
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError> {
        let mut state = self.state.write().await;
        state.calls.push(MockCall::DeleteTorrent(id.to_string()));
        match state.torrents.iter().position(|t| t.id == id) {
            Some(at) => {
                let torrent = state.torrents.remove(at);
                state.graveyard.push(torrent);
                Ok(())
            }
            None => Err(not_found("torrent", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_unrestrict_creates_download() {
        let api = MockDebridClient::new();
        api.set_link_file("L1", "Show.S01E01.mkv").await;

        let download = api.unrestrict_link("L1", None).await.unwrap();
        assert_eq!(download.filename, "Show.S01E01.mkv");
        assert!(download.is_streamable());
        assert_eq!(api.downloads().await.len(), 1);
        assert_eq!(api.unrestricted_links().await, vec!["L1"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let api = MockDebridClient::new();
        api.fail_link("L1", MockFailure::ServiceUnavailable).await;
        api.fail_link("L2", MockFailure::NotStreamable).await;

        let err = api.unrestrict_link("L1", None).await.unwrap_err();
        assert!(err.is_service_unavailable());

        let download = api.unrestrict_link("L2", None).await.unwrap();
        assert!(!download.is_streamable());

        let check = api.check_link("L1", None).await.unwrap();
        assert!(!check.is_supported());
    }

    #[tokio::test]
    async fn test_reinsertion_revives_with_new_links() {
        let api = MockDebridClient::new();
        let mut dead = fixtures::torrent("T1", "Movie.2020.mkv", TorrentStatus::Dead, &["L1"]);
        dead.hash = Some("abc".to_string());
        api.add_torrent(dead).await;

        api.delete_torrent("T1").await.unwrap();
        let added = api.add_magnet("magnet:?xt=urn:btih:abc", None).await.unwrap();
        let revived = api.get_torrent_info(&added.id).await.unwrap();

        assert_ne!(revived.id, "T1");
        assert_eq!(revived.status, TorrentStatus::Downloaded);
        assert_eq!(revived.links.len(), 1);
        assert_ne!(revived.links[0], "L1");
        assert_eq!(revived.filename, "Movie.2020.mkv");
    }

    #[tokio::test]
    async fn test_paging() {
        let api = MockDebridClient::new();
        for i in 0..5 {
            api.add_torrent(fixtures::torrent(
                &format!("T{}", i),
                "x",
                TorrentStatus::Downloaded,
                &[],
            ))
            .await;
        }
        assert_eq!(api.list_torrents(1, 2).await.unwrap().len(), 2);
        assert_eq!(api.list_torrents(3, 2).await.unwrap().len(), 1);
        assert!(api.list_torrents(4, 2).await.unwrap().is_empty());
    }
}
