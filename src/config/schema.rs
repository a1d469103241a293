//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience core. All types derive Serde traits for deserialization from
//! config files, and every field has a default so an empty file is valid.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Circuit breakers keyed by the dependency they guard.
    pub breakers: BTreeMap<String, BreakerConfig>,

    /// Background job workers.
    pub workers: WorkersConfig,

    /// Backing store for job queues.
    pub store: StoreConfig,

    /// Outbound email relay and WhatsApp gateway endpoints.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API settings.
    pub admin: AdminConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breakers: default_breakers(),
            workers: WorkersConfig::default(),
            store: StoreConfig::default(),
            dispatch: DispatchConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// What a breaker hands back instead of calling its dependency while open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// No fallback: open-circuit calls fail with a circuit-open error.
    #[default]
    None,
    /// Skip the operation and return `null`.
    Skip,
    /// Report the work as queued for retry.
    Queued,
    /// Refuse the call with an operator-facing message.
    Unavailable { message: String },
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures while closed before the breaker trips.
    pub failure_threshold: u32,

    /// Consecutive half-open successes before the breaker closes again.
    pub success_threshold: u32,

    /// Per-call timeout in milliseconds.
    pub call_timeout_ms: u64,

    /// Time spent open before a trial call is admitted, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Fallback used while open.
    pub fallback: FallbackPolicy,
}

impl BreakerConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    fn preset(
        failure_threshold: u32,
        success_threshold: u32,
        call_timeout_ms: u64,
        reset_timeout_ms: u64,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            call_timeout_ms,
            reset_timeout_ms,
            fallback,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::preset(5, 2, 10_000, 30_000, FallbackPolicy::None)
    }
}

/// The breakers guarding the CRM's external dependencies.
pub fn default_breakers() -> BTreeMap<String, BreakerConfig> {
    let mut breakers = BTreeMap::new();
    breakers.insert(
        "database".to_string(),
        BreakerConfig::preset(
            5,
            2,
            10_000,
            30_000,
            FallbackPolicy::Unavailable {
                message: "Database is temporarily unavailable. Please try again later.".to_string(),
            },
        ),
    );
    breakers.insert(
        "redis".to_string(),
        BreakerConfig::preset(3, 2, 5_000, 20_000, FallbackPolicy::Skip),
    );
    breakers.insert(
        "whatsapp-api".to_string(),
        BreakerConfig::preset(5, 3, 15_000, 60_000, FallbackPolicy::Queued),
    );
    breakers.insert(
        "email".to_string(),
        BreakerConfig::preset(5, 3, 10_000, 30_000, FallbackPolicy::Queued),
    );
    breakers.insert(
        "external-api".to_string(),
        BreakerConfig::preset(
            10,
            3,
            20_000,
            60_000,
            FallbackPolicy::Unavailable {
                message: "External service is temporarily unavailable. Please try again later."
                    .to_string(),
            },
        ),
    );
    breakers
}

/// Polling executor configuration for a single worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum jobs in flight at once.
    pub concurrency: usize,

    /// Delay between poll cycles in milliseconds.
    pub poll_interval_ms: u64,

    /// Total attempts a job gets before it is dead-lettered.
    pub max_retries: u32,

    /// Fixed delay before a failed job re-enters the queue, in milliseconds.
    pub retry_delay_ms: u64,

    /// Per-job execution timeout in milliseconds.
    pub timeout_ms: u64,

    /// Ceiling on how long `stop` waits for in-flight jobs, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            poll_interval_ms: 1000,
            max_retries: 3,
            retry_delay_ms: 5000,
            timeout_ms: 300_000,
            shutdown_timeout_ms: 30_000,
        }
    }
}

/// The fixed set of workers owned by the manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub email: WorkerConfig,
    pub notification: WorkerConfig,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            email: WorkerConfig {
                concurrency: 10,
                poll_interval_ms: 2000,
                max_retries: 3,
                retry_delay_ms: 10_000,
                timeout_ms: 30_000,
                ..WorkerConfig::default()
            },
            notification: WorkerConfig {
                concurrency: 5,
                poll_interval_ms: 1000,
                max_retries: 3,
                retry_delay_ms: 5000,
                timeout_ms: 60_000,
                ..WorkerConfig::default()
            },
        }
    }
}

/// Which store backs the job queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

/// Queue store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Connection URL for the redis backend.
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

/// Outbound collaborators used by the concrete workers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Email relay endpoint receiving one JSON message per POST.
    pub email_endpoint: String,

    /// WhatsApp gateway endpoint receiving one JSON notification per POST.
    pub notification_endpoint: String,

    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            email_endpoint: "http://127.0.0.1:8090/email".to_string(),
            notification_endpoint: "http://127.0.0.1:8091/notifications".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder key shipped in the defaults; refused while the API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Operator API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the operator API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Operator API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
