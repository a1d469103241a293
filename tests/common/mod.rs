//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crm_resilience::config::schema::{BreakerConfig, FallbackPolicy, WorkerConfig};
use crm_resilience::jobs::dispatch::{DispatchError, EmailTransport, NotificationGateway};
use crm_resilience::jobs::email::EmailJob;
use crm_resilience::jobs::notification::NotificationJob;
use crm_resilience::jobs::{Job, JobProcessor, JobResult};

/// What a [`ScriptedProcessor`] does with every job.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Sleep(Duration),
    Panic(&'static str),
    /// Per-job script read from the payload: `sleepMs` before answering,
    /// and failure while `attempts < failAttempts`.
    FromPayload,
}

/// Processor that follows a fixed script and records what it saw.
pub struct ScriptedProcessor {
    behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl ScriptedProcessor {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `start:<id>` / `end:<id>` entries in execution order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Ids in the order their attempts started.
    pub fn started(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix("start:"))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl JobProcessor for ScriptedProcessor {
    type Payload = Value;

    async fn process(&self, job: &Job<Value>) -> JobResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.lock().push(format!("start:{}", job.id));

        let result = match self.behavior {
            Behavior::Succeed => JobResult::ok(job.payload.clone()),
            Behavior::Fail(message) => JobResult::failed(message),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                JobResult::ok(json!({ "slept_ms": duration.as_millis() as u64 }))
            }
            Behavior::Panic(message) => panic!("{message}"),
            Behavior::FromPayload => {
                if let Some(ms) = job.payload["sleepMs"].as_u64() {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                let fail_attempts = job.payload["failAttempts"].as_u64().unwrap_or(0);
                if u64::from(job.attempts) < fail_attempts {
                    JobResult::failed("scripted failure")
                } else {
                    JobResult::ok(job.payload.clone())
                }
            }
        };

        self.log.lock().push(format!("end:{}", job.id));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Email transport / notification gateway that records deliveries.
#[derive(Default)]
pub struct RecordingDispatcher {
    failing: AtomicBool,
    emails: Mutex<Vec<EmailJob>>,
    notifications: Mutex<Vec<NotificationJob>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn emails(&self) -> Vec<EmailJob> {
        self.emails.lock().clone()
    }

    pub fn notifications(&self) -> Vec<NotificationJob> {
        self.notifications.lock().clone()
    }

    fn check(&self) -> Result<(), DispatchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DispatchError::Other("gateway unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EmailTransport for RecordingDispatcher {
    async fn send(&self, email: &EmailJob) -> Result<Value, DispatchError> {
        self.check()?;
        self.emails.lock().push(email.clone());
        Ok(json!({ "messageId": "m-1" }))
    }
}

#[async_trait]
impl NotificationGateway for RecordingDispatcher {
    async fn deliver(&self, notification: &NotificationJob) -> Result<Value, DispatchError> {
        self.check()?;
        self.notifications.lock().push(notification.clone());
        Ok(json!({ "delivered": true }))
    }
}

pub fn worker_config(concurrency: usize, max_retries: u32) -> WorkerConfig {
    WorkerConfig {
        concurrency,
        poll_interval_ms: 10,
        max_retries,
        retry_delay_ms: 10,
        timeout_ms: 2_000,
        shutdown_timeout_ms: 2_000,
    }
}

pub fn breaker_config(failure_threshold: u32, success_threshold: u32, reset_timeout_ms: u64) -> BreakerConfig {
    BreakerConfig {
        failure_threshold,
        success_threshold,
        call_timeout_ms: 1_000,
        reset_timeout_ms,
        fallback: FallbackPolicy::None,
    }
}

/// Poll `condition` until it holds or `within` elapses.
pub async fn eventually<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
