pub mod cache;
pub mod classify;
pub mod config;
pub mod debrid;
pub mod engine;
pub mod library;
pub mod metrics;
pub mod testing;
pub mod watch;

pub use cache::{is_expired, CacheEntry, CacheError, CachedLink, JsonFileLinkCache, LinkCache};
pub use classify::{classify, precategorize, ClassifiedName, EpisodeInfo, ExtraCategory, MediaKind};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    LoggingConfig, SanitizedConfig,
};
pub use debrid::{
    DebridApi, DebridError, Download, RealDebridClient, RetryPolicy, Torrent, TorrentStatus,
};
pub use engine::{
    BatchStats, DownloadIndex, EngineError, EngineOptions, MaintenanceReport, ProcessOutcome,
    SweepMode, SyncEngine, TorrentHealth, TorrentReport,
};
pub use library::{LibraryError, LibraryOptions, LibraryWriter, SaveOutcome};
pub use watch::{SyncWatcher, WatchOptions, WatchStatus};
