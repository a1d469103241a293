//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ResilienceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `store.redis_url`.
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ResilienceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate a TOML document.
pub fn parse_config(content: &str) -> Result<ResilienceConfig, ConfigError> {
    let mut config: ResilienceConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given, otherwise fall back to validated defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ResilienceConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => parse_config(""),
    }
}

fn apply_env_overrides(config: &mut ResilienceConfig) {
    if let Ok(url) = std::env::var(REDIS_URL_ENV) {
        if !url.is_empty() {
            config.store.redis_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [workers.notification]
            concurrency = 1
            retry_delay_ms = 10

            [admin]
            enabled = true
            api_key = "ops-secret"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.workers.notification.concurrency, 1);
        assert_eq!(config.workers.notification.retry_delay_ms, 10);
        assert!(config.admin.enabled);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = parse_config("[workers.email]\nconcurrency = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors[0].field, "workers.email.concurrency");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = parse_config("[workers.email\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/crm-resilience.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
