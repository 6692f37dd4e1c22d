use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub debrid: DebridConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote debrid API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DebridConfig {
    /// Bearer token for the REST API
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Worker pool size for page fetches and torrent processing
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    /// Requests per minute for general endpoints
    #[serde(default = "default_general_rate_limit")]
    pub general_rate_limit: u32,
    /// Requests per minute for torrent endpoints
    #[serde(default = "default_torrents_rate_limit")]
    pub torrents_rate_limit: u32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl DebridConfig {
    /// Config with the given token and every other field at its default.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: default_base_url(),
            concurrent_requests: default_concurrent_requests(),
            general_rate_limit: default_general_rate_limit(),
            torrents_rate_limit: default_torrents_rate_limit(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_concurrent_requests() -> usize {
    32
}

fn default_general_rate_limit() -> u32 {
    60
}

fn default_torrents_rate_limit() -> u32 {
    25
}

fn default_page_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

/// Output library configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report extras as skipped instead of filing them under `Extras/`
    #[serde(default)]
    pub skip_extras: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            skip_extras: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./Library")
}

/// Link resolution cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_true() -> bool {
    true
}

/// Watch mode configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Sleep between iterations (seconds)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Minimum time between full health-check sweeps (minutes)
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_mins: u64,
    /// Extra delay after a failed iteration (seconds)
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_interval_secs: default_refresh_interval(),
            health_check_interval_mins: default_health_check_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    10
}

fn default_health_check_interval() -> u64 {
    60
}

fn default_error_backoff() -> u64 {
    30
}

/// Dead torrent repair configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepairConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Metrics export configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Prometheus text file written after every run
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

/// Sanitized config for log output (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub debrid: SanitizedDebridConfig,
    pub library: LibraryConfig,
    pub cache: CacheConfig,
    pub watch: WatchConfig,
    pub repair: RepairConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDebridConfig {
    pub token: String,
    pub base_url: String,
    pub concurrent_requests: usize,
    pub general_rate_limit: u32,
    pub torrents_rate_limit: u32,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

const REDACTED: &str = "[REDACTED]";

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let debrid = &config.debrid;
        Self {
            debrid: SanitizedDebridConfig {
                token: REDACTED.to_string(),
                base_url: debrid.base_url.clone(),
                concurrent_requests: debrid.concurrent_requests,
                general_rate_limit: debrid.general_rate_limit,
                torrents_rate_limit: debrid.torrents_rate_limit,
                page_size: debrid.page_size,
                timeout_secs: debrid.timeout_secs,
                max_retries: debrid.max_retries,
            },
            library: config.library.clone(),
            cache: config.cache.clone(),
            watch: config.watch.clone(),
            repair: config.repair.clone(),
            logging: config.logging.clone(),
            metrics: config.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        toml::from_str(
            r#"
[debrid]
token = "secret-token"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = minimal_config();
        assert_eq!(config.debrid.concurrent_requests, 32);
        assert_eq!(config.debrid.general_rate_limit, 60);
        assert_eq!(config.debrid.torrents_rate_limit, 25);
        assert_eq!(config.debrid.page_size, 100);
        assert_eq!(config.debrid.max_retries, 5);
        assert_eq!(config.library.output_dir, PathBuf::from("./Library"));
        assert!(!config.library.skip_extras);
        assert!(config.cache.enabled);
        assert!(!config.watch.enabled);
        assert_eq!(config.watch.refresh_interval_secs, 10);
        assert_eq!(config.watch.health_check_interval_mins, 60);
        assert!(config.repair.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_sanitized_config_redacts_token() {
        let config = minimal_config();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.debrid.token, "[REDACTED]");

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(json.contains("api.real-debrid.com"));
    }

    #[test]
    fn test_log_format_json() {
        let config: Config = toml::from_str(
            r#"
[debrid]
token = "t"

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
