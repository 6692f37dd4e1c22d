//! Retry wrapper for debrid API calls.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::DebridError;

/// How failed calls are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for transient failures, including the first call.
    pub max_attempts: u32,
    /// Backoff unit; the first retry sleeps `base_delay`, then it doubles.
    pub base_delay: Duration,
    /// Delay used when a 429 carries no usable `Retry-After`.
    pub default_retry_after: Duration,
    /// Safety cap on consecutive 429 retries.
    pub max_rate_limited: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(1),
            max_rate_limited: 30,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Sleep before retrying after `failures` consecutive transient failures.
    fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        self.base_delay.saturating_mul(2u32.saturating_pow(exponent))
    }
}

/// Run `op` until it succeeds or fails with a non-retryable error.
///
/// - `RateLimited` sleeps for the server delay and retries without using
///   the transient budget.
/// - `Transient` backs off exponentially until `max_attempts` is reached,
///   then returns `MaxRetriesExceeded`.
/// - Everything else, `ServiceUnavailable` included, is returned as is.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    endpoint: &str,
    mut op: F,
) -> Result<T, DebridError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DebridError>>,
{
    let mut failures = 0u32;
    let mut rate_limited = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(DebridError::RateLimited { retry_after }) => {
                rate_limited += 1;
                if rate_limited > policy.max_rate_limited {
                    return Err(DebridError::MaxRetriesExceeded {
                        attempts: failures + rate_limited,
                        last_error: "rate limited".to_string(),
                    });
                }
                let delay = if retry_after.is_zero() {
                    policy.default_retry_after
                } else {
                    retry_after
                };
                debug!(
                    endpoint = endpoint,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, honoring Retry-After"
                );
                tokio::time::sleep(delay).await;
            }
            Err(DebridError::Transient(message)) => {
                failures += 1;
                if failures >= policy.max_attempts {
                    warn!(
                        endpoint = endpoint,
                        attempts = failures,
                        error = %message,
                        "Request failed, retries exhausted"
                    );
                    return Err(DebridError::MaxRetriesExceeded {
                        attempts: failures,
                        last_error: message,
                    });
                }
                let delay = policy.backoff(failures);
                debug!(
                    endpoint = endpoint,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            default_retry_after: Duration::from_millis(1),
            max_rate_limited: 3,
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast_policy(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DebridError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(&fast_policy(), "test", || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DebridError::Transient("connection reset".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_exhausts_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_policy(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DebridError::Transient("timeout".into()))
        })
        .await;
        assert!(matches!(
            result,
            Err(DebridError::MaxRetriesExceeded { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_service_unavailable_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_policy(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DebridError::ServiceUnavailable("hoster_unavailable".into()))
        })
        .await;
        assert!(matches!(result, Err(DebridError::ServiceUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_does_not_use_transient_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 2,
            ..fast_policy()
        };
        let result = with_retry(&policy, "test", || {
            let calls = Arc::clone(&calls);
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(DebridError::RateLimited {
                        retry_after: Duration::from_millis(1),
                    }),
                    2 => Err(DebridError::Transient("blip".into())),
                    _ => Ok(()),
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_rate_limited_cap() {
        let result: Result<(), _> = with_retry(&fast_policy(), "test", || async {
            Err(DebridError::RateLimited {
                retry_after: Duration::ZERO,
            })
        })
        .await;
        assert!(matches!(result, Err(DebridError::MaxRetriesExceeded { .. })));
    }

    #[tokio::test]
    async fn test_api_error_passthrough() {
        let result: Result<(), _> = with_retry(&fast_policy(), "test", || async {
            Err(DebridError::Api {
                status: 404,
                message: "unknown_ressource".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(DebridError::Api { status: 404, .. })));
    }

    #[test]
    fn test_backoff_starts_at_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
    }
}
