//! Background job subsystem.
//!
//! # Data Flow
//! ```text
//! Application code:
//!     → Worker::add_job / WorkerManager::submit (enqueue, return id)
//!
//! Poll loop (worker.rs, one per worker):
//!     → dequeue up to free slots → spawn execution
//!     → JobProcessor::process under the job timeout
//!         email.rs / notification.rs → breaker → dispatch.rs
//!     → success: result record, Completed event
//!     → failure: Retry (fixed delay, back to tail) or Failed (dead letter)
//!
//! Manager (manager.rs):
//!     → start all at boot, observe events, stop all in parallel at shutdown
//! ```
//!
//! # Design Decisions
//! - `|active_jobs| <= concurrency` is enforced by the single poll task
//! - Job failures never reach the enqueuer; they surface only through
//!   events, the failed queue, and status queries
//! - A breaker fallback inside a job is a failed attempt, so the job is
//!   retried rather than reported delivered

pub mod dispatch;
pub mod email;
pub mod events;
pub mod job;
pub mod manager;
pub mod notification;
pub mod worker;

pub use events::WorkerEvent;
pub use job::{Job, JobId, JobOptions, JobRecord, JobResult};
pub use manager::{ManagedWorker, ManagerError, WorkerManager};
pub use worker::{JobProcessor, QueueSizes, Worker, WorkerError, WorkerStatus};
