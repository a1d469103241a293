//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, timeouts and concurrency > 0)
//! - Reject unusable store and admin settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{
    BreakerConfig, ResilienceConfig, StoreBackend, WorkerConfig, PLACEHOLDER_API_KEY,
};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, breaker) in &config.breakers {
        validate_breaker(&format!("breakers.{name}"), breaker, &mut errors);
    }
    validate_worker("workers.email", &config.workers.email, &mut errors);
    validate_worker("workers.notification", &config.workers.notification, &mut errors);

    if config.store.backend == StoreBackend::Redis && config.store.redis_url.trim().is_empty() {
        errors.push(ValidationError::new(
            "store.redis_url",
            "must be set when the redis backend is selected",
        ));
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::new(
            "admin.api_key",
            "placeholder key must be replaced before enabling the admin API",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(prefix: &str, breaker: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(format!("{prefix}.failure_threshold"), "must be > 0"));
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::new(format!("{prefix}.success_threshold"), "must be > 0"));
    }
    if breaker.call_timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.call_timeout_ms"), "must be > 0"));
    }
    if breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.reset_timeout_ms"), "must be > 0"));
    }
}

fn validate_worker(prefix: &str, worker: &WorkerConfig, errors: &mut Vec<ValidationError>) {
    if worker.concurrency == 0 {
        errors.push(ValidationError::new(format!("{prefix}.concurrency"), "must be > 0"));
    }
    if worker.poll_interval_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.poll_interval_ms"), "must be > 0"));
    }
    if worker.max_retries == 0 {
        errors.push(ValidationError::new(format!("{prefix}.max_retries"), "must be > 0"));
    }
    if worker.timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.timeout_ms"), "must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ResilienceConfig::default();
        if let Some(db) = config.breakers.get_mut("database") {
            db.failure_threshold = 0;
            db.reset_timeout_ms = 0;
        }
        config.workers.email.concurrency = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "breakers.database.failure_threshold",
                "breakers.database.reset_timeout_ms",
                "workers.email.concurrency",
                "admin.api_key",
            ]
        );
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let mut config = ResilienceConfig::default();
        config.store.backend = StoreBackend::Redis;
        config.store.redis_url = "  ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "store.redis_url: must be set when the redis backend is selected");
    }
}
