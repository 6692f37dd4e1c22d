use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - API token is present
/// - Concurrency, rate limits and page size are non-zero
/// - Watch refresh interval is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let debrid = &config.debrid;

    if debrid.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "debrid.token is required".to_string(),
        ));
    }

    if debrid.concurrent_requests == 0 {
        return Err(ConfigError::ValidationError(
            "debrid.concurrent_requests cannot be 0".to_string(),
        ));
    }

    if debrid.general_rate_limit == 0 || debrid.torrents_rate_limit == 0 {
        return Err(ConfigError::ValidationError(
            "debrid rate limits cannot be 0".to_string(),
        ));
    }

    if debrid.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "debrid.page_size cannot be 0".to_string(),
        ));
    }

    if config.watch.refresh_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "watch.refresh_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config_with(extra: &str) -> Config {
        load_config_from_str(&format!("[debrid]\ntoken = \"t\"\n{}", extra)).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config_with("")).is_ok());
    }

    #[test]
    fn test_validate_empty_token_fails() {
        let mut config = config_with("");
        config.debrid.token = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let config = config_with("concurrent_requests = 0");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_rate_limit_fails() {
        let config = config_with("torrents_rate_limit = 0");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_refresh_interval_fails() {
        let config = config_with("\n[watch]\nrefresh_interval_secs = 0");
        assert!(validate_config(&config).is_err());
    }
}
