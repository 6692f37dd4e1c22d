//! Paged listing helpers.
//!
//! Page 1 is fetched alone; a short page means there is nothing more.
//! Pages 2 to 4 are then probed concurrently to gauge the account size, and
//! the remaining pages fan out at full concurrency in windows sized from that
//! estimate. Fan-out stops at the first short or empty page.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tracing::debug;

use super::{DebridApi, DebridError, Download, Torrent};

/// Pages fetched concurrently after page 1.
const PROBE_PAGES: usize = 3;

/// Pages added on top of the estimate, and the size of follow-up windows.
const ESTIMATE_SLACK_PAGES: usize = 10;

/// Fetch every page through `fetch`, preserving page order.
///
/// Page futures are boxed so the sweep stays `Send` when spawned.
pub async fn fetch_all_pages<'a, T, F>(
    fetch: F,
    page_size: usize,
    concurrency: usize,
) -> Result<Vec<T>, DebridError>
where
    F: Fn(usize) -> BoxFuture<'a, Result<Vec<T>, DebridError>>,
{
    let page_size = page_size.max(1);
    let concurrency = concurrency.max(1);

    let mut items = fetch(1).await?;
    if items.len() < page_size {
        return Ok(items);
    }

    let probe_end = 1 + PROBE_PAGES;
    let mut probes = stream::iter(2..=probe_end)
        .map(|page| fetch(page))
        .buffered(PROBE_PAGES.min(concurrency));
    while let Some(page) = probes.next().await {
        let page = page?;
        let short = page.len() < page_size;
        items.extend(page);
        if short {
            return Ok(items);
        }
    }
    drop(probes);

    let estimated_pages = items.len() / page_size + ESTIMATE_SLACK_PAGES;
    debug!(
        fetched = items.len(),
        estimated_pages, "Fanning out remaining pages"
    );

    let mut start = probe_end + 1;
    let mut end = estimated_pages.max(start);
    loop {
        let mut pages = stream::iter(start..=end)
            .map(|page| fetch(page))
            .buffered(concurrency);
        while let Some(page) = pages.next().await {
            let page = page?;
            let short = page.len() < page_size;
            items.extend(page);
            if short {
                return Ok(items);
            }
        }
        start = end + 1;
        end = start + ESTIMATE_SLACK_PAGES - 1;
    }
}

/// Every torrent on the account.
pub async fn fetch_all_torrents(
    api: &dyn DebridApi,
    page_size: usize,
    concurrency: usize,
) -> Result<Vec<Torrent>, DebridError> {
    fetch_all_pages(
        |page| api.list_torrents(page, page_size),
        page_size,
        concurrency,
    )
    .await
}

/// Every download on the account.
pub async fn fetch_all_downloads(
    api: &dyn DebridApi,
    page_size: usize,
    concurrency: usize,
) -> Result<Vec<Download>, DebridError> {
    fetch_all_pages(
        |page| api.list_downloads(page, page_size),
        page_size,
        concurrency,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    /// Serves `total` numbered items in pages and records requested pages.
    struct PagedSource {
        total: usize,
        page_size: usize,
        requested: Mutex<Vec<usize>>,
    }

    impl PagedSource {
        fn new(total: usize, page_size: usize) -> Self {
            Self {
                total,
                page_size,
                requested: Mutex::new(Vec::new()),
            }
        }

        async fn page(&self, page: usize) -> Result<Vec<usize>, DebridError> {
            self.requested.lock().unwrap().push(page);
            let start = (page - 1) * self.page_size;
            let end = (start + self.page_size).min(self.total);
            Ok((start.min(end)..end).collect())
        }

        fn max_requested(&self) -> usize {
            self.requested.lock().unwrap().iter().copied().max().unwrap_or(0)
        }
    }

    #[tokio::test]
    async fn test_single_short_page() {
        let source = PagedSource::new(42, 100);
        let items = fetch_all_pages(|p| source.page(p).boxed(), 100, 8).await.unwrap();
        assert_eq!(items.len(), 42);
        assert_eq!(source.max_requested(), 1);
    }

    #[tokio::test]
    async fn test_stops_within_probe() {
        let source = PagedSource::new(250, 100);
        let items = fetch_all_pages(|p| source.page(p).boxed(), 100, 8).await.unwrap();
        assert_eq!(items, (0..250).collect::<Vec<_>>());
        assert!(source.max_requested() <= 4);
    }

    #[tokio::test]
    async fn test_exact_page_multiple_reads_empty_page() {
        let source = PagedSource::new(200, 100);
        let items = fetch_all_pages(|p| source.page(p).boxed(), 100, 8).await.unwrap();
        assert_eq!(items.len(), 200);
    }

    #[tokio::test]
    async fn test_large_account_in_order() {
        let source = PagedSource::new(1234, 100);
        let items = fetch_all_pages(|p| source.page(p).boxed(), 100, 4).await.unwrap();
        assert_eq!(items, (0..1234).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_beyond_initial_estimate() {
        // 400 after the probe gives an estimate of 14 pages; 3000 items need 31
        let source = PagedSource::new(3000, 100);
        let items = fetch_all_pages(|p| source.page(p).boxed(), 100, 32).await.unwrap();
        assert_eq!(items.len(), 3000);
        assert_eq!(items.last(), Some(&2999));
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let result: Result<Vec<u8>, _> = fetch_all_pages(
            |page| {
                async move {
                    if page == 1 {
                        Ok(vec![0u8; 10])
                    } else {
                        Err(DebridError::Transient("boom".into()))
                    }
                }
                .boxed()
            },
            10,
            4,
        )
        .await;
        assert!(matches!(result, Err(DebridError::Transient(_))));
    }
}
