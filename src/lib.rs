//! Resilience core of the real-estate CRM backend.
//!
//! Circuit breakers guard calls to external dependencies (database, cache,
//! WhatsApp gateway, email relay, third-party APIs); polling workers execute
//! deferred jobs with bounded concurrency, fixed-delay retries and a
//! dead-letter queue.

pub mod admin;
pub mod clock;
pub mod config;
pub mod jobs;
pub mod lifecycle;
pub mod observability;
pub mod queue;
pub mod resilience;

pub use config::ResilienceConfig;
pub use lifecycle::{ResilienceContext, Shutdown};
pub use resilience::{CircuitBreaker, CircuitBreakerRegistry};
