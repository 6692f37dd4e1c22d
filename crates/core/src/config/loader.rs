use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `STRMSYNC_DEBRID__TOKEN`.
pub const ENV_PREFIX: &str = "STRMSYNC_";

/// Legacy variable still accepted for the API token.
pub const LEGACY_TOKEN_VAR: &str = "REALDEBRID_TOKEN";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::raw()
                .only(&[LEGACY_TOKEN_VAR])
                .map(|_| "debrid.token".into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[debrid]
token = "abc"
concurrent_requests = 8

[library]
output_dir = "/media/strm"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.debrid.token, "abc");
        assert_eq!(config.debrid.concurrent_requests, 8);
        assert_eq!(config.library.output_dir, PathBuf::from("/media/strm"));
    }

    #[test]
    fn test_load_config_from_str_missing_debrid() {
        let toml = r#"
[library]
output_dir = "/media/strm"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[debrid]
token = "from-file"
torrents_rate_limit = 10

[watch]
enabled = true
refresh_interval_secs = 5
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.debrid.torrents_rate_limit, 10);
        assert!(config.watch.enabled);
        assert_eq!(config.watch.refresh_interval_secs, 5);
    }
}
