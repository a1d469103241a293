//! Concurrency-bounded polling executor.
//!
//! # Responsibilities
//! - Poll the worker's queue every `poll_interval`
//! - Run up to `concurrency` jobs at once, each under the job timeout
//! - Re-enqueue failed jobs after a fixed delay, dead-letter exhausted ones
//! - Drain in-flight jobs on `stop`, bounded by `shutdown_timeout`
//!
//! # Design Decisions
//! - One poll task per worker; job executions are spawned and never block it
//! - A job id is claimed in `active_jobs` before its task is spawned and
//!   released by a guard only after the outcome bookkeeping finished
//! - Store outages skip the cycle; the loop itself never exits on errors
//! - A timed-out job is abandoned, not cancelled at the dependency
//! - A panic inside `process` is a failed attempt like any other

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::events::WorkerEvent;
use super::job::{Job, JobId, JobOptions, JobRecord, JobResult};
use crate::clock::epoch_millis;
use crate::config::schema::WorkerConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::queue::{JobQueue, KvListStore, QueueError};
use crate::resilience::retries::{RetryDecision, RetryPolicy};
use crate::resilience::timeouts::with_timeout;

const DRAIN_POLL: Duration = Duration::from_millis(100);
const EVENT_CAPACITY: usize = 256;

/// Job-type specific work. The only thing a concrete worker implements.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Run one attempt. Failures are reported in the result, not raised.
    async fn process(&self, job: &Job<Self::Payload>) -> JobResult;
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("invalid job payload: {0}")]
    Payload(serde_json::Error),
}

/// Operator view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub name: String,
    pub running: bool,
    pub active_jobs: usize,
    pub concurrency: usize,
    pub peak_active_jobs: usize,
    pub scheduled_retries: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSizes {
    pub pending: usize,
    pub failed: usize,
}

struct RunHandle {
    shutdown: Shutdown,
    poll_task: JoinHandle<()>,
}

struct WorkerInner<P: JobProcessor> {
    name: String,
    config: WorkerConfig,
    retry: RetryPolicy,
    queue: JobQueue,
    processor: P,
    running: AtomicBool,
    active_jobs: Mutex<HashSet<JobId>>,
    peak_active: AtomicUsize,
    scheduled_retries: AtomicUsize,
    events: broadcast::Sender<WorkerEvent>,
    run: Mutex<Option<RunHandle>>,
}

/// Releases a claimed job id when execution bookkeeping is done.
struct ActiveJobGuard<P: JobProcessor> {
    inner: Arc<WorkerInner<P>>,
    job_id: JobId,
}

impl<P: JobProcessor> Drop for ActiveJobGuard<P> {
    fn drop(&mut self) {
        let active = {
            let mut active = self.inner.active_jobs.lock();
            active.remove(&self.job_id);
            active.len()
        };
        metrics::record_active_jobs(&self.inner.name, active);
    }
}

/// A named polling worker. Cloning yields another handle to the same worker.
pub struct Worker<P: JobProcessor> {
    inner: Arc<WorkerInner<P>>,
}

impl<P: JobProcessor> Clone for Worker<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: JobProcessor> Worker<P> {
    pub fn new(
        name: impl Into<String>,
        config: WorkerConfig,
        store: Arc<dyn KvListStore>,
        processor: P,
    ) -> Self {
        let name = name.into();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(WorkerInner {
                queue: JobQueue::new(store, name.clone()),
                retry: RetryPolicy::fixed(config.retry_delay()),
                name,
                config,
                processor,
                running: AtomicBool::new(false),
                active_jobs: Mutex::new(HashSet::new()),
                peak_active: AtomicUsize::new(0),
                scheduled_retries: AtomicUsize::new(0),
                events,
                run: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn processor(&self) -> &P {
        &self.inner.processor
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.inner.active_jobs.lock().len()
    }

    /// Subscribe to completed/retry/failed events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.inner.events.subscribe()
    }

    /// Start the poll loop. Starting a running worker only logs a warning.
    pub fn start(&self) {
        let mut run = self.inner.run.lock();
        if run.is_some() {
            tracing::warn!(worker = %self.name(), "Worker already running");
            return;
        }

        self.inner.running.store(true, Ordering::SeqCst);
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let worker = self.clone();
        let poll_task = tokio::spawn(async move { worker.poll_loop(rx).await });
        *run = Some(RunHandle {
            shutdown,
            poll_task,
        });

        tracing::info!(
            worker = %self.name(),
            concurrency = self.inner.config.concurrency,
            poll_interval_ms = self.inner.config.poll_interval_ms,
            "Worker started"
        );
    }

    /// Stop polling and wait for in-flight jobs, up to `shutdown_timeout`.
    ///
    /// Jobs still running past the ceiling are left behind with a warning.
    pub async fn stop(&self) {
        let run = self.inner.run.lock().take();
        let Some(run) = run else {
            return;
        };

        tracing::info!(worker = %self.name(), "Stopping worker");
        self.inner.running.store(false, Ordering::SeqCst);
        run.shutdown.trigger();
        if let Err(e) = run.poll_task.await {
            tracing::error!(worker = %self.name(), error = %e, "Poll task ended abnormally");
        }

        let deadline = Instant::now() + self.inner.config.shutdown_timeout();
        loop {
            let remaining = self.active_count();
            if remaining == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    worker = %self.name(),
                    remaining,
                    "Shutdown timeout reached with jobs still in flight"
                );
                break;
            }
            time::sleep(DRAIN_POLL).await;
        }

        tracing::info!(worker = %self.name(), "Worker stopped");
    }

    /// Enqueue a job and return its id without waiting for execution.
    pub async fn add_job(
        &self,
        job_type: impl Into<String>,
        payload: P::Payload,
        options: JobOptions,
    ) -> Result<JobId, WorkerError> {
        let id = options.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let max_retries = options
            .max_retries
            .filter(|n| *n > 0)
            .unwrap_or(self.inner.config.max_retries);
        let job = Job::new(id.clone(), job_type, payload, max_retries);

        self.inner.queue.enqueue(&job).await?;
        tracing::debug!(worker = %self.name(), job_id = %id, job_type = %job.job_type, "Job added");
        Ok(id)
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            name: self.inner.name.clone(),
            running: self.is_running(),
            active_jobs: self.active_count(),
            concurrency: self.inner.config.concurrency,
            peak_active_jobs: self.inner.peak_active.load(Ordering::SeqCst),
            scheduled_retries: self.inner.scheduled_retries.load(Ordering::SeqCst),
        }
    }

    pub async fn queue_sizes(&self) -> Result<QueueSizes, WorkerError> {
        Ok(QueueSizes {
            pending: self.inner.queue.pending_len().await?,
            failed: self.inner.queue.failed_len().await?,
        })
    }

    /// Completed job record, while its TTL lasts.
    pub async fn job_result(&self, id: &str) -> Result<Option<JobRecord<P::Payload>>, WorkerError> {
        Ok(self.inner.queue.result(id).await?)
    }

    /// Permanently failed job, while its TTL lasts.
    pub async fn failed_job(&self, id: &str) -> Result<Option<Job<P::Payload>>, WorkerError> {
        Ok(self.inner.queue.failed_job(id).await?)
    }

    pub async fn clear_queue(&self) -> Result<(), WorkerError> {
        self.inner.queue.clear().await?;
        tracing::info!(worker = %self.name(), "Queue cleared");
        Ok(())
    }

    pub async fn clear_failed_queue(&self) -> Result<(), WorkerError> {
        self.inner.queue.clear_failed().await?;
        tracing::info!(worker = %self.name(), "Failed queue cleared");
        Ok(())
    }

    async fn poll_loop(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.inner.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_running() {
                        break;
                    }
                    self.poll_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(worker = %self.name(), "Poll loop received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Fill free slots from the queue.
    async fn poll_once(&self) {
        let free = self
            .inner
            .config
            .concurrency
            .saturating_sub(self.active_count());

        for _ in 0..free {
            if !self.is_running() {
                break;
            }

            let job = match self.inner.queue.dequeue::<P::Payload>().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(QueueError::Store(e)) => {
                    tracing::warn!(worker = %self.name(), error = %e, "Queue store unavailable, skipping poll cycle");
                    break;
                }
                Err(QueueError::Codec(e)) => {
                    tracing::error!(worker = %self.name(), error = %e, "Moved undecodable job to failed queue");
                    continue;
                }
            };

            let Some(guard) = self.claim(&job.id) else {
                tracing::warn!(worker = %self.name(), job_id = %job.id, "Job already in flight, requeueing");
                if let Err(e) = self.inner.queue.enqueue(&job).await {
                    tracing::error!(worker = %self.name(), job_id = %job.id, error = %e, "Failed to requeue duplicate job");
                }
                continue;
            };

            let worker = self.clone();
            tokio::spawn(async move { worker.execute(job, guard).await });
        }

        if let Ok(sizes) = self.queue_sizes().await {
            metrics::record_queue_depth(self.name(), sizes.pending, sizes.failed);
        }
    }

    fn claim(&self, job_id: &str) -> Option<ActiveJobGuard<P>> {
        let active = {
            let mut active = self.inner.active_jobs.lock();
            if !active.insert(job_id.to_string()) {
                return None;
            }
            active.len()
        };
        self.inner.peak_active.fetch_max(active, Ordering::SeqCst);
        metrics::record_active_jobs(self.name(), active);

        Some(ActiveJobGuard {
            inner: Arc::clone(&self.inner),
            job_id: job_id.to_string(),
        })
    }

    async fn execute(self, mut job: Job<P::Payload>, _guard: ActiveJobGuard<P>) {
        let started = std::time::Instant::now();
        job.processed_at = Some(epoch_millis());
        tracing::debug!(
            worker = %self.name(),
            job_id = %job.id,
            attempt = job.attempts + 1,
            "Processing job"
        );

        let outcome = with_timeout(
            "Job",
            self.inner.config.timeout(),
            AssertUnwindSafe(self.inner.processor.process(&job)).catch_unwind(),
        )
        .await;
        metrics::record_job_duration(self.name(), started);

        match outcome {
            Ok(Ok(result)) if result.success => self.complete(job, result).await,
            Ok(Ok(result)) => {
                let error = result.error.unwrap_or_else(|| "Job failed".to_string());
                self.fail(job, error).await;
            }
            Ok(Err(panic)) => {
                let error = format!("job panicked: {}", panic_message(panic.as_ref()));
                self.fail(job, error).await;
            }
            Err(elapsed) => self.fail(job, elapsed.to_string()).await,
        }
    }

    async fn complete(&self, mut job: Job<P::Payload>, result: JobResult) {
        job.completed_at = Some(epoch_millis());
        let event = WorkerEvent::Completed {
            job_id: job.id.clone(),
            job_type: job.job_type.clone(),
            attempts: job.attempts,
            data: result.data.clone(),
        };

        let record = JobRecord { job, result };
        if let Err(e) = self.inner.queue.save_result(&record).await {
            tracing::error!(worker = %self.name(), job_id = %record.job.id, error = %e, "Failed to persist job result");
        }

        tracing::info!(worker = %self.name(), job_id = %record.job.id, "Job completed");
        let _ = self.inner.events.send(event);
    }

    async fn fail(&self, mut job: Job<P::Payload>, error: String) {
        job.attempts += 1;
        job.last_error = Some(error.clone());

        match self.inner.retry.decide(job.attempts, job.max_retries) {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    worker = %self.name(),
                    job_id = %job.id,
                    attempt = job.attempts,
                    max_retries = job.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Job failed, scheduling retry"
                );
                let event = WorkerEvent::Retry {
                    job_id: job.id.clone(),
                    job_type: job.job_type.clone(),
                    attempts: job.attempts,
                    error,
                    delay,
                };
                self.schedule_retry(job, delay);
                let _ = self.inner.events.send(event);
            }
            RetryDecision::Exhausted => {
                job.failed_at = Some(epoch_millis());
                tracing::error!(
                    worker = %self.name(),
                    job_id = %job.id,
                    attempts = job.attempts,
                    error = %error,
                    "Job permanently failed"
                );
                if let Err(e) = self.inner.queue.dead_letter(&job).await {
                    tracing::error!(worker = %self.name(), job_id = %job.id, error = %e, "Failed to dead-letter job");
                }
                let _ = self.inner.events.send(WorkerEvent::Failed {
                    job_id: job.id.clone(),
                    job_type: job.job_type.clone(),
                    attempts: job.attempts,
                    error,
                });
            }
        }
    }

    fn schedule_retry(&self, job: Job<P::Payload>, delay: Duration) {
        self.inner.scheduled_retries.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            time::sleep(delay).await;
            if let Err(e) = inner.queue.enqueue(&job).await {
                tracing::error!(worker = %inner.name, job_id = %job.id, error = %e, "Failed to re-enqueue job for retry");
            }
            inner.scheduled_retries.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryStore;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl JobProcessor for Echo {
        type Payload = Value;

        async fn process(&self, job: &Job<Value>) -> JobResult {
            JobResult::ok(job.payload.clone())
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig {
            concurrency: 2,
            poll_interval_ms: 10,
            max_retries: 3,
            retry_delay_ms: 10,
            timeout_ms: 1000,
            shutdown_timeout_ms: 1000,
        }
    }

    #[tokio::test]
    async fn test_add_job_uses_defaults_and_overrides() {
        let store = Arc::new(MemoryStore::new());
        let worker = Worker::new("echo", config(), store.clone(), Echo);

        let generated = worker.add_job("echo", json!(1), JobOptions::default()).await.unwrap();
        let custom = worker
            .add_job("echo", json!(2), JobOptions { id: Some("fixed".into()), max_retries: Some(7) })
            .await
            .unwrap();

        assert!(Uuid::parse_str(&generated).is_ok());
        assert_eq!(custom, "fixed");
        assert_eq!(worker.queue_sizes().await.unwrap(), QueueSizes { pending: 2, failed: 0 });

        let queue = JobQueue::new(store, "echo");
        let first: Job<Value> = queue.dequeue().await.unwrap().unwrap();
        let second: Job<Value> = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(first.max_retries, 3);
        assert_eq!(second.max_retries, 7);
        assert_eq!(second.attempts, 0);
    }

    #[tokio::test]
    async fn test_zero_retry_budget_falls_back_to_config() {
        let store = Arc::new(MemoryStore::new());
        let worker = Worker::new("echo", config(), store.clone(), Echo);
        worker
            .add_job("echo", json!(1), JobOptions { id: None, max_retries: Some(0) })
            .await
            .unwrap();

        let job: Job<Value> = JobQueue::new(store, "echo").dequeue().await.unwrap().unwrap();
        assert_eq!(job.max_retries, 3);
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let worker = Worker::new("echo", config(), Arc::new(MemoryStore::new()), Echo);

        worker.start();
        worker.start();
        assert!(worker.status().running);

        worker.stop().await;
        worker.stop().await;
        assert!(!worker.status().running);
    }

    #[tokio::test]
    async fn test_completed_job_result_is_persisted() {
        let worker = Worker::new("echo", config(), Arc::new(MemoryStore::new()), Echo);
        let mut events = worker.subscribe();
        let id = worker.add_job("echo", json!({ "n": 1 }), JobOptions::default()).await.unwrap();

        worker.start();
        let event = time::timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
        worker.stop().await;

        assert_eq!(event.job_id(), id);
        assert_eq!(event.outcome(), "completed");
        let record = worker.job_result(&id).await.unwrap().unwrap();
        assert!(record.result.success);
        assert!(record.job.completed_at.is_some());
        assert_eq!(record.result.data, Some(json!({ "n": 1 })));
    }
}
