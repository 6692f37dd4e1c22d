//! Types for the reconciliation engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::debrid::{DebridError, Torrent};

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Debrid API error.
    #[error("debrid error: {0}")]
    Debrid(#[from] DebridError),

    /// A dead torrent carries no info hash to rebuild a magnet from.
    #[error("torrent {torrent_id} has no info hash")]
    MissingHash { torrent_id: String },

    /// One step of a reinsertion failed.
    #[error("reinsertion of {torrent_id} failed at {step}: {source}")]
    Reinsertion {
        torrent_id: String,
        step: &'static str,
        #[source]
        source: DebridError,
    },
}

/// Engine behaviour switches.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Worker budget shared by page fetches, repairs and processing.
    pub concurrency: usize,
    /// Items per listing page.
    pub page_size: usize,
    /// Reinsert dead torrents.
    pub repair_enabled: bool,
    /// Run the health phase before processing.
    pub health_check: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: 32,
            page_size: 100,
            repair_enabled: true,
            health_check: true,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.debrid.concurrent_requests,
            page_size: config.debrid.page_size,
            repair_enabled: config.repair.enabled,
            health_check: true,
        }
    }
}

/// Health of a torrent, read from its remote status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentHealth {
    /// Downloaded and ready to process.
    Healthy,
    /// Dead on the remote side, candidate for reinsertion.
    Dead,
    /// Still queued, downloading or errored. Left alone this cycle.
    Deferred,
}

/// Where a resolved URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// An existing, unexpired download on the account.
    Download,
    /// The local link cache.
    Cache,
    /// A fresh unrestrict call.
    Unrestrict,
}

impl LinkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkSource::Download => "download",
            LinkSource::Cache => "cache",
            LinkSource::Unrestrict => "unrestrict",
        }
    }
}

/// Per-torrent processing summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TorrentReport {
    pub torrent_id: String,
    pub filename: String,
    /// Files now holding this torrent's URLs, including pre-existing equivalents.
    pub saved_paths: Vec<PathBuf>,
    /// Files actually created or rewritten this run.
    pub written: usize,
    pub skipped_extras: usize,
    pub skipped_samples: usize,
    pub reused_downloads: usize,
    pub cache_hits: usize,
    pub unrestricted: usize,
    /// Stale or unusable downloads deleted remotely.
    pub deleted_downloads: usize,
    /// Links that could not be resolved or written.
    pub failed_links: usize,
}

impl TorrentReport {
    pub fn new(torrent: &Torrent) -> Self {
        Self {
            torrent_id: torrent.id.clone(),
            filename: torrent.filename.clone(),
            ..Default::default()
        }
    }
}

/// Result of processing one torrent.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Links resolved; whatever could be written was written.
    Saved(TorrentReport),
    /// The hoster reported itself unavailable. Nothing was written.
    NeedsReinsertion(Torrent),
    /// Not downloaded yet, or no links.
    Empty,
}

/// Which torrents a sweep looks at.
#[derive(Debug, Clone, Copy)]
pub enum SweepMode<'a> {
    /// Every torrent, with the health phase when enabled.
    Full,
    /// Only torrents not in the given set, without the health phase.
    NewOnly(&'a std::collections::HashSet<String>),
}
