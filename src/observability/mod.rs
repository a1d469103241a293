//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers, workers and the manager produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON in production)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Breaker name / worker name / job id are fields on every event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
