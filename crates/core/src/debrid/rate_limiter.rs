//! Token bucket rate limiting for the debrid API.
//!
//! The API enforces separate budgets for torrent endpoints and everything
//! else, so the client holds two independent buckets.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::trace;

use crate::metrics;

/// Rate limit status for a bucket.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub requests_per_minute: u32,
    pub tokens_available: f64,
    pub next_available_in_ms: Option<u64>,
}

/// Token bucket with continuous refill.
///
/// Tokens are added in proportion to elapsed time (`rpm / 60` per second)
/// rather than on a fixed tick, so a burst up to capacity is allowed after
/// an idle period and sustained throughput never exceeds the configured rate.
pub struct TokenBucket {
    /// Max tokens (= requests per minute).
    capacity: f64,
    tokens: f64,
    /// Tokens added per second.
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute.max(1) as f64;
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Try to take one token.
    ///
    /// Returns `Err(wait)` with the time until a token will be available.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(tokens_needed / self.refill_rate))
        }
    }

    pub fn status(&mut self) -> RateLimitStatus {
        self.refill();
        RateLimitStatus {
            requests_per_minute: self.capacity as u32,
            tokens_available: self.tokens,
            next_available_in_ms: if self.tokens >= 1.0 {
                None
            } else {
                let tokens_needed = 1.0 - self.tokens;
                Some((tokens_needed / self.refill_rate * 1000.0) as u64)
            },
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Async wrapper around a [`TokenBucket`] shared by concurrent callers.
pub struct RateLimiter {
    name: &'static str,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(name: &'static str, requests_per_minute: u32) -> Self {
        Self {
            name,
            bucket: Mutex::new(TokenBucket::new(requests_per_minute)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait until a token is available and consume it.
    ///
    /// The lock is released while sleeping; waiters re-check after waking,
    /// so concurrent callers are admitted one token at a time.
    /// Returns the total time spent waiting.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match bucket.try_acquire() {
                    Ok(()) => break,
                    Err(wait) => wait,
                }
            };
            trace!(bucket = self.name, wait_ms = wait.as_millis() as u64, "Waiting for token");
            metrics::RATE_LIMIT_WAITS.with_label_values(&[self.name]).inc();
            sleep(wait).await;
        }
        started.elapsed()
    }

    pub async fn status(&self) -> RateLimitStatus {
        self.bucket.lock().await.status()
    }
}

/// Which bucket an endpoint draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    General,
    Torrents,
}

/// The pair of buckets used by the client.
pub struct RateLimiters {
    general: RateLimiter,
    torrents: RateLimiter,
}

impl RateLimiters {
    pub fn new(general_rpm: u32, torrents_rpm: u32) -> Self {
        Self {
            general: RateLimiter::new("general", general_rpm),
            torrents: RateLimiter::new("torrents", torrents_rpm),
        }
    }

    pub fn get(&self, class: EndpointClass) -> &RateLimiter {
        match class {
            EndpointClass::General => &self.general,
            EndpointClass::Torrents => &self.torrents,
        }
    }

    pub async fn acquire(&self, class: EndpointClass) -> Duration {
        self.get(class).acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_token_bucket_new() {
        let mut bucket = TokenBucket::new(60);
        let status = bucket.status();
        assert_eq!(status.requests_per_minute, 60);
        assert!(status.tokens_available >= 59.99);
        assert!(status.next_available_in_ms.is_none());
    }

    #[tokio::test]
    async fn test_token_bucket_drains_then_reports_wait() {
        let mut bucket = TokenBucket::new(60);
        for _ in 0..60 {
            assert!(bucket.try_acquire().is_ok());
        }

        // 60 rpm refills one token per second
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait <= Duration::from_secs(1));
        assert!(wait > Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_token_bucket_refill_is_continuous() {
        // 6000 rpm = 100 tokens/sec
        let mut bucket = TokenBucket::new(6000);
        for _ in 0..6000 {
            let _ = bucket.try_acquire();
        }
        assert!(bucket.try_acquire().is_err());

        sleep(Duration::from_millis(50)).await;
        let status = bucket.status();
        assert!(status.tokens_available >= 4.0);
        assert!(status.tokens_available < 6000.0);
    }

    #[tokio::test]
    async fn test_token_bucket_never_exceeds_capacity() {
        let mut bucket = TokenBucket::new(10);
        sleep(Duration::from_millis(20)).await;
        assert!(bucket.status().tokens_available <= 10.0);
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire_waits_when_empty() {
        // 1200 rpm = 20 tokens/sec, one token every 50ms
        let limiter = RateLimiter::new("test", 1200);
        for _ in 0..1200 {
            limiter.bucket.lock().await.try_acquire().unwrap();
        }

        let waited = limiter.acquire().await;
        assert!(waited >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_rate_limiter_concurrent_callers() {
        let limiter = Arc::new(RateLimiter::new("test", 600));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let status = limiter.status().await;
        assert!(status.tokens_available <= 581.0);
    }

    #[tokio::test]
    async fn test_rate_limiters_are_independent() {
        let limiters = RateLimiters::new(60, 1);
        limiters.acquire(EndpointClass::Torrents).await;

        let torrents = limiters.get(EndpointClass::Torrents).status().await;
        assert!(torrents.next_available_in_ms.is_some());

        let general = limiters.get(EndpointClass::General).status().await;
        assert!(general.next_available_in_ms.is_none());
        assert_eq!(limiters.get(EndpointClass::General).name(), "general");
    }
}
