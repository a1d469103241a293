//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to external dependency:
//!     → registry.rs (look up the breaker guarding that dependency)
//!     → circuit_breaker.rs (admit, fail fast, or hand back the fallback)
//!     → timeouts.rs (bound the admitted call)
//!
//! Failed background job:
//!     → retries.rs (fixed delay re-enqueue, or dead-letter once exhausted)
//! ```
//!
//! # Design Decisions
//! - Every guarded call has a deadline; a timeout is recorded as a failure
//! - Breakers never retry; retries happen at the job level only
//! - Breaker state lives in process memory and resets on restart

pub mod circuit_breaker;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerError, BreakerStats, CircuitBreaker, CircuitState, Fallback, Outcome,
};
pub use registry::{CircuitBreakerRegistry, RegistrySummary};
