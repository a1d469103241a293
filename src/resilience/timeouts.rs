//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap breaker calls and job executions with a deadline
//! - Report an elapsed deadline as a single error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timeout stops waiting; the wrapped future is dropped, but side effects
//!   it already started against external systems may still complete

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A guarded call or job exceeded its allotted time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{label} timeout after {}ms", .after.as_millis())]
pub struct OperationTimeout {
    /// What timed out ("Operation", "Job").
    pub label: &'static str,
    pub after: Duration,
}

/// Run `future` with a deadline of `after`.
pub async fn with_timeout<F>(
    label: &'static str,
    after: Duration,
    future: F,
) -> Result<F::Output, OperationTimeout>
where
    F: Future,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| OperationTimeout { label, after })
}
