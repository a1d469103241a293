//! Worker manager.
//!
//! Owns the fixed set of named workers, starts them at boot, stops them in
//! parallel at shutdown, and answers status and queue-size queries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::events::WorkerEvent;
use super::job::{JobId, JobOptions};
use super::worker::{JobProcessor, QueueSizes, Worker, WorkerError, WorkerStatus};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Payload-erased view of a worker.
#[async_trait]
pub trait ManagedWorker: Send + Sync {
    fn name(&self) -> &str;
    fn start(&self);
    async fn stop(&self);
    fn status(&self) -> WorkerStatus;
    async fn queue_sizes(&self) -> Result<QueueSizes, WorkerError>;

    /// Enqueue a JSON payload, decoding it into the worker's payload type first.
    async fn submit(&self, job_type: &str, payload: Value, options: JobOptions)
        -> Result<JobId, WorkerError>;

    fn subscribe(&self) -> broadcast::Receiver<WorkerEvent>;
    async fn clear_failed_queue(&self) -> Result<(), WorkerError>;
}

#[async_trait]
impl<P: JobProcessor> ManagedWorker for Worker<P> {
    fn name(&self) -> &str {
        Worker::name(self)
    }

    fn start(&self) {
        Worker::start(self)
    }

    async fn stop(&self) {
        Worker::stop(self).await
    }

    fn status(&self) -> WorkerStatus {
        Worker::status(self)
    }

    async fn queue_sizes(&self) -> Result<QueueSizes, WorkerError> {
        Worker::queue_sizes(self).await
    }

    async fn submit(
        &self,
        job_type: &str,
        payload: Value,
        options: JobOptions,
    ) -> Result<JobId, WorkerError> {
        let payload: P::Payload = serde_json::from_value(payload).map_err(WorkerError::Payload)?;
        self.add_job(job_type, payload, options).await
    }

    fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        Worker::subscribe(self)
    }

    async fn clear_failed_queue(&self) -> Result<(), WorkerError> {
        Worker::clear_failed_queue(self).await
    }
}

/// Named workers and their lifecycle.
#[derive(Default)]
pub struct WorkerManager {
    workers: BTreeMap<String, Arc<dyn ManagedWorker>>,
    observers: Mutex<Vec<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker under its own name, replacing any previous one.
    pub fn register(&mut self, worker: Arc<dyn ManagedWorker>) {
        self.workers.insert(worker.name().to_string(), worker);
    }

    /// Start every worker and its event observer. Repeated calls are no-ops.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("Workers already initialized");
            return;
        }

        let mut observers = self.observers.lock();
        for worker in self.workers.values() {
            observers.push(spawn_observer(worker.name().to_string(), worker.subscribe()));
            worker.start();
        }
        tracing::info!(workers = self.workers.len(), "All workers initialized");
    }

    /// Stop every worker in parallel and wait for all of them.
    pub async fn shutdown(&self) {
        if !self.initialized.swap(false, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Shutting down workers");
        join_all(self.workers.values().map(|worker| worker.stop())).await;

        let observers: Vec<_> = self.observers.lock().drain(..).collect();
        for observer in observers {
            observer.abort();
        }
        tracing::info!("All workers stopped");
    }

    pub fn get_worker(&self, name: &str) -> Option<Arc<dyn ManagedWorker>> {
        self.workers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    pub fn get_status(&self) -> BTreeMap<String, WorkerStatus> {
        self.workers
            .iter()
            .map(|(name, worker)| (name.clone(), worker.status()))
            .collect()
    }

    /// Pending and failed counts per worker; a worker whose store fails reports zeros.
    pub async fn get_queue_sizes(&self) -> BTreeMap<String, QueueSizes> {
        let mut sizes = BTreeMap::new();
        for (name, worker) in &self.workers {
            let size = match worker.queue_sizes().await {
                Ok(size) => {
                    metrics::record_queue_depth(name, size.pending, size.failed);
                    size
                }
                Err(e) => {
                    tracing::error!(worker = %name, error = %e, "Failed to read queue sizes");
                    QueueSizes::default()
                }
            };
            sizes.insert(name.clone(), size);
        }
        sizes
    }

    pub async fn submit(
        &self,
        worker: &str,
        job_type: &str,
        payload: Value,
        options: JobOptions,
    ) -> Result<JobId, ManagerError> {
        let target = self
            .get_worker(worker)
            .ok_or_else(|| ManagerError::UnknownWorker(worker.to_string()))?;
        Ok(target.submit(job_type, payload, options).await?)
    }

    pub async fn clear_failed_queue(&self, worker: &str) -> Result<(), ManagerError> {
        let target = self
            .get_worker(worker)
            .ok_or_else(|| ManagerError::UnknownWorker(worker.to_string()))?;
        Ok(target.clear_failed_queue().await?)
    }
}

fn spawn_observer(worker: String, mut events: broadcast::Receiver<WorkerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    metrics::record_job(&worker, event.outcome());
                    match &event {
                        WorkerEvent::Completed { job_id, job_type, .. } => {
                            tracing::info!(worker = %worker, job_id = %job_id, job_type = %job_type, "Job completed");
                        }
                        WorkerEvent::Retry { job_id, attempts, error, .. } => {
                            tracing::warn!(worker = %worker, job_id = %job_id, attempt = attempts, error = %error, "Job retry scheduled");
                        }
                        WorkerEvent::Failed { job_id, attempts, error, .. } => {
                            tracing::error!(worker = %worker, job_id = %job_id, attempts = attempts, error = %error, "Job failed permanently");
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(worker = %worker, skipped, "Worker event observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
