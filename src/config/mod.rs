//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → ResilienceConfig (validated, immutable)
//!     → handed to lifecycle::startup to build breakers and workers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers and workers copy what they need
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::BreakerConfig;
pub use schema::FallbackPolicy;
pub use schema::ResilienceConfig;
pub use schema::WorkerConfig;
