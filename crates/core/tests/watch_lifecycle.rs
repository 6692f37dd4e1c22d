//! Watch loop integration tests.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use strmsync_core::{
    cache::{JsonFileLinkCache, LinkCache},
    debrid::{DebridApi, TorrentStatus},
    engine::{EngineOptions, SyncEngine},
    library::{LibraryOptions, LibraryWriter},
    testing::{fixtures, MockDebridClient},
    watch::{SyncWatcher, WatchOptions, WatchStatus},
};

struct TestHarness {
    api: Arc<MockDebridClient>,
    watcher: SyncWatcher,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_options(WatchOptions {
            refresh_interval: Duration::from_millis(20),
            health_check_interval: Duration::from_secs(3600),
            error_backoff: Duration::from_millis(20),
        })
    }

    fn with_options(options: WatchOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let api = Arc::new(MockDebridClient::new());
        let cache = Arc::new(JsonFileLinkCache::new(temp_dir.path().join("cache")));

        let engine = SyncEngine::new(
            Arc::clone(&api) as Arc<dyn DebridApi>,
            LibraryWriter::new(temp_dir.path().join("Library"), LibraryOptions::default()),
            Some(cache as Arc<dyn LinkCache>),
            EngineOptions {
                concurrency: 2,
                page_size: 10,
                repair_enabled: true,
                health_check: true,
            },
        );

        let watcher = SyncWatcher::new(Arc::new(engine), options);

        Self {
            api,
            watcher,
            _temp_dir: temp_dir,
        }
    }

    /// Poll the watcher status until `check` passes or two seconds elapse.
    async fn wait_for(&self, check: impl Fn(&WatchStatus) -> bool) -> WatchStatus {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let status = self.watcher.status().await;
            if check(&status) || tokio::time::Instant::now() >= deadline {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[tokio::test]
async fn test_full_sweep_then_incremental_pickup() {
    let h = TestHarness::new();
    h.api
        .add_torrent(fixtures::torrent(
            "T1",
            "Show.Name.S01E01.720p",
            TorrentStatus::Downloaded,
            &["L1"],
        ))
        .await;
    h.api.set_link_file("L1", "Show.Name.S01E01.720p.mkv").await;

    let handle = h.watcher.start().await.expect("watch loop should start");
    assert!(h.watcher.is_running());
    assert!(h.watcher.start().await.is_none());

    let status = h.wait_for(|s| s.known_torrents == 1).await;
    assert_eq!(status.full_sweeps, 1);
    assert_eq!(status.known_torrents, 1);

    h.api
        .add_torrent(fixtures::torrent(
            "T2",
            "Show.Name.S01E02.720p",
            TorrentStatus::Downloaded,
            &["L2"],
        ))
        .await;
    h.api.set_link_file("L2", "Show.Name.S01E02.720p.mkv").await;

    let status = h.wait_for(|s| s.known_torrents == 2).await;
    assert_eq!(status.known_torrents, 2);
    // Health interval has not elapsed, so no second full sweep
    assert_eq!(status.full_sweeps, 1);

    // Seen torrents are not unrestricted again
    assert_eq!(h.api.unrestricted_links().await, vec!["L1", "L2"]);

    h.watcher.stop();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should stop")
        .unwrap();

    assert!(!h.watcher.is_running());
    assert!(!h.watcher.status().await.running);
}

#[tokio::test]
async fn test_failed_iterations_do_not_stop_loop() {
    let h = TestHarness::new();
    h.api.set_fail_listing(true).await;

    let handle = h.watcher.start().await.expect("watch loop should start");

    let status = h.wait_for(|s| s.failed_iterations >= 2).await;
    assert!(status.failed_iterations >= 2);
    assert_eq!(status.full_sweeps, 0);
    assert!(status.last_error.is_some());
    assert!(h.watcher.is_running());

    // Recovers once the service is back
    h.api.set_fail_listing(false).await;
    let status = h.wait_for(|s| s.full_sweeps == 1).await;
    assert_eq!(status.full_sweeps, 1);
    assert!(status.last_error.is_none());

    h.watcher.stop();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should stop")
        .unwrap();
}

#[tokio::test]
async fn test_full_sweep_forgets_removed_torrents() {
    // Zero health interval makes every iteration a full sweep
    let h = TestHarness::with_options(WatchOptions {
        refresh_interval: Duration::from_millis(20),
        health_check_interval: Duration::ZERO,
        error_backoff: Duration::from_millis(20),
    });
    for (id, link, file) in [
        ("T1", "L1", "Show.Name.S02E01.mkv"),
        ("T2", "L2", "Show.Name.S02E02.mkv"),
    ] {
        h.api
            .add_torrent(fixtures::torrent(id, file, TorrentStatus::Downloaded, &[link]))
            .await;
        h.api.set_link_file(link, file).await;
    }

    let handle = h.watcher.start().await.expect("watch loop should start");
    let status = h.wait_for(|s| s.known_torrents == 2).await;
    assert_eq!(status.known_torrents, 2);

    h.api.delete_torrent("T1").await.unwrap();

    let status = h.wait_for(|s| s.known_torrents == 1).await;
    assert_eq!(status.known_torrents, 1);
    assert!(status.full_sweeps >= 2);

    h.watcher.stop();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should stop")
        .unwrap();
}
