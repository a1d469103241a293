//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Breaker registry → Queue store → Workers → Manager
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop admin server → Stop polling → Drain jobs → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then workers, then the admin listener
//! - Ordered shutdown: stop accepting operator calls, stop polling, drain
//! - Draining has a ceiling: in-flight jobs past it are abandoned with a warning

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, ContextBuilder, ResilienceContext, StartupError};
