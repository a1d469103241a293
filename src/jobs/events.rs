//! Worker lifecycle events.

use std::time::Duration;

use serde_json::Value;

use super::job::JobId;

/// Emitted once per terminal outcome or scheduled retry.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Completed {
        job_id: JobId,
        job_type: String,
        attempts: u32,
        data: Option<Value>,
    },
    Retry {
        job_id: JobId,
        job_type: String,
        attempts: u32,
        error: String,
        delay: Duration,
    },
    Failed {
        job_id: JobId,
        job_type: String,
        attempts: u32,
        error: String,
    },
}

impl WorkerEvent {
    pub fn job_id(&self) -> &str {
        match self {
            WorkerEvent::Completed { job_id, .. }
            | WorkerEvent::Retry { job_id, .. }
            | WorkerEvent::Failed { job_id, .. } => job_id,
        }
    }

    /// Metric label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkerEvent::Completed { .. } => "completed",
            WorkerEvent::Retry { .. } => "retry",
            WorkerEvent::Failed { .. } => "failed",
        }
    }
}
