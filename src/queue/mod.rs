//! Job queue storage.
//!
//! # Data Flow
//! ```text
//! Worker::add_job
//!     → job_queue.rs (serialize, push to tail of queue:<name>)
//!     → KvListStore (memory.rs in-process, redis.rs behind the `redis` feature)
//!
//! Poll cycle:
//!     → job_queue.rs (pop from head, deserialize)
//!     → terminal outcome: job:result:<id> or queue:<name>:failed + job:failed:<id>
//! ```
//!
//! # Design Decisions
//! - The store contract is the minimal list + TTL key surface; push/pop
//!   atomicity is the store's job, so no in-process locking guards a queue
//! - Store errors are reported, never panicked on; the worker skips the cycle
//! - Circuit breakers never touch this store

pub mod job_queue;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use job_queue::{JobQueue, QueueError};
pub use memory::MemoryStore;

/// Errors raised by a queue store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed a command.
    #[error("store command failed: {0}")]
    Command(String),
}

/// Key/value + list store backing the job queues.
#[async_trait]
pub trait KvListStore: Send + Sync {
    /// Append `value` to the tail of the list at `key`.
    async fn list_push_tail(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove and return the head of the list at `key`.
    async fn list_pop_head(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key` (list or value). Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
