//! Debrid service API client.
//!
//! This module provides a `DebridApi` trait for the remote account and a
//! Real-Debrid implementation with token-bucket throttling, retries and
//! paged listing helpers.

mod pagination;
mod rate_limiter;
mod real_debrid;
mod retry;
mod types;

pub use pagination::{fetch_all_downloads, fetch_all_pages, fetch_all_torrents};
pub use rate_limiter::{EndpointClass, RateLimitStatus, RateLimiter, RateLimiters, TokenBucket};
pub use real_debrid::RealDebridClient;
pub use retry::{with_retry, RetryPolicy};
pub use types::*;
