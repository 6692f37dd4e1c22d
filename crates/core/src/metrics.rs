//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Debrid API traffic (requests, rate limit waits)
//! - Link resolution and library writes
//! - Torrent repair and run phases

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Debrid API
// =============================================================================

/// API requests by endpoint and outcome.
pub static API_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("strmsync_api_requests_total", "Total debrid API requests"),
        &["endpoint", "outcome"], // "ok", "rate_limited", "unavailable", "transient", "error"
    )
    .unwrap()
});

/// Times a caller had to wait for a rate limit token.
pub static RATE_LIMIT_WAITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmsync_rate_limit_waits_total",
            "Times a request waited for a rate limit token",
        ),
        &["bucket"],
    )
    .unwrap()
});

// =============================================================================
// Reconciliation
// =============================================================================

/// Links resolved by where the direct URL came from.
pub static LINKS_RESOLVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("strmsync_links_resolved_total", "Links resolved to direct URLs"),
        &["source"], // "download", "cache", "unrestrict"
    )
    .unwrap()
});

/// Library write outcomes.
pub static LIBRARY_WRITES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("strmsync_library_writes_total", "Reference file save outcomes"),
        &["outcome"], // "written", "unchanged", "duplicate", "skipped_extra", "failed"
    )
    .unwrap()
});

/// Dead torrent reinsertions by result.
pub static REINSERTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("strmsync_reinsertions_total", "Torrent reinsertion attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Duration of each run phase in seconds.
pub static PHASE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("strmsync_phase_duration_seconds", "Duration of run phases")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0]),
        &["phase"], // "fetch", "health_check", "process"
    )
    .unwrap()
});

/// Registry holding every metric above.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    registry.register(Box::new(API_REQUESTS.clone())).unwrap();
    registry.register(Box::new(RATE_LIMIT_WAITS.clone())).unwrap();
    registry.register(Box::new(LINKS_RESOLVED.clone())).unwrap();
    registry.register(Box::new(LIBRARY_WRITES.clone())).unwrap();
    registry.register(Box::new(REINSERTIONS.clone())).unwrap();
    registry.register(Box::new(PHASE_DURATION.clone())).unwrap();
    registry
});

/// Render all metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
