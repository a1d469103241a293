//! Job records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::epoch_millis;

/// Job identifier, unique within its queue.
pub type JobId = String;

/// A unit of deferred work as stored in a queue.
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job<T> {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(rename = "data")]
    pub payload: T,
    pub attempts: u32,
    pub max_retries: u32,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<u64>,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl<T> Job<T> {
    pub fn new(id: JobId, job_type: impl Into<String>, payload: T, max_retries: u32) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            payload,
            attempts: 0,
            max_retries,
            created_at: epoch_millis(),
            processed_at: None,
            completed_at: None,
            failed_at: None,
            last_error: None,
        }
    }

    /// Completed or permanently failed.
    pub fn is_terminal(&self) -> bool {
        self.completed_at.is_some() || self.failed_at.is_some()
    }
}

/// Per-job overrides accepted by `add_job`.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Caller-supplied id instead of a generated one.
    pub id: Option<JobId>,
    /// Attempt budget instead of the worker's configured `max_retries`.
    pub max_retries: Option<u32>,
}

/// What `process` reports for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// A completed job persisted with its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord<T> {
    pub job: Job<T>,
    pub result: JobResult,
}
