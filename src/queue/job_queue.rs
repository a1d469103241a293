//! Typed FIFO of jobs for one worker.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::{KvListStore, StoreError};
use crate::jobs::job::{Job, JobRecord};

/// Retention of completed job records.
pub const RESULT_TTL: Duration = Duration::from_secs(86_400);

/// Retention of failed job records.
pub const FAILED_TTL: Duration = Duration::from_secs(604_800);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("job codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Live queue, dead-letter queue and job records of one named worker.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn KvListStore>,
    name: String,
    queue_key: String,
    failed_key: String,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").field("name", &self.name).finish()
    }
}

impl JobQueue {
    pub fn new(store: Arc<dyn KvListStore>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            store,
            queue_key: format!("queue:{name}"),
            failed_key: format!("queue:{name}:failed"),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Push to the tail of the live queue.
    pub async fn enqueue<T: Serialize>(&self, job: &Job<T>) -> Result<(), QueueError> {
        let raw = serde_json::to_string(job)?;
        self.store.list_push_tail(&self.queue_key, raw).await?;
        Ok(())
    }

    /// Pop the head of the live queue.
    ///
    /// A payload that no longer decodes is moved verbatim to the failed
    /// queue and reported as [`QueueError::Codec`].
    pub async fn dequeue<T: DeserializeOwned>(&self) -> Result<Option<Job<T>>, QueueError> {
        let Some(raw) = self.store.list_pop_head(&self.queue_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                self.store.list_push_tail(&self.failed_key, raw).await?;
                Err(QueueError::Codec(e))
            }
        }
    }

    /// Append to the failed queue and write the failed-job record.
    pub async fn dead_letter<T: Serialize>(&self, job: &Job<T>) -> Result<(), QueueError> {
        let raw = serde_json::to_string(job)?;
        self.store.list_push_tail(&self.failed_key, raw.clone()).await?;
        self.store
            .set_with_ttl(&format!("job:failed:{}", job.id), raw, FAILED_TTL)
            .await?;
        Ok(())
    }

    pub async fn save_result<T: Serialize>(&self, record: &JobRecord<T>) -> Result<(), QueueError> {
        let raw = serde_json::to_string(record)?;
        self.store
            .set_with_ttl(&format!("job:result:{}", record.job.id), raw, RESULT_TTL)
            .await?;
        Ok(())
    }

    pub async fn result<T: DeserializeOwned>(&self, id: &str) -> Result<Option<JobRecord<T>>, QueueError> {
        match self.store.get(&format!("job:result:{id}")).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn failed_job<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Job<T>>, QueueError> {
        match self.store.get(&format!("job:failed:{id}")).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn pending_len(&self) -> Result<usize, QueueError> {
        Ok(self.store.list_len(&self.queue_key).await?)
    }

    pub async fn failed_len(&self) -> Result<usize, QueueError> {
        Ok(self.store.list_len(&self.failed_key).await?)
    }

    /// Drop every pending job.
    pub async fn clear(&self) -> Result<(), QueueError> {
        Ok(self.store.delete(&self.queue_key).await?)
    }

    /// Drop every dead-lettered job. Failed-job records expire on their own.
    pub async fn clear_failed(&self) -> Result<(), QueueError> {
        Ok(self.store.delete(&self.failed_key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::JobResult;
    use crate::queue::MemoryStore;
    use serde_json::{json, Value};

    fn queue() -> (Arc<MemoryStore>, JobQueue) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), JobQueue::new(store, "email"))
    }

    #[tokio::test]
    async fn test_enqueue_dequeue_preserves_order() {
        let (store, queue) = queue();
        queue.enqueue(&Job::new("a".into(), "send", json!(1), 3)).await.unwrap();
        queue.enqueue(&Job::new("b".into(), "send", json!(2), 3)).await.unwrap();

        assert_eq!(store.list_len("queue:email").await.unwrap(), 2);
        let first: Job<Value> = queue.dequeue().await.unwrap().unwrap();
        let second: Job<Value> = queue.dequeue().await.unwrap().unwrap();
        assert_eq!((first.id.as_str(), second.id.as_str()), ("a", "b"));
        assert!(queue.dequeue::<Value>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dead_letter_writes_list_and_record() {
        let (_, queue) = queue();
        let mut job = Job::new("x".into(), "send", json!({}), 2);
        job.attempts = 2;

        queue.dead_letter(&job).await.unwrap();

        assert_eq!(queue.failed_len().await.unwrap(), 1);
        assert_eq!(queue.pending_len().await.unwrap(), 0);
        let stored: Job<Value> = queue.failed_job("x").await.unwrap().unwrap();
        assert_eq!(stored.attempts, 2);

        queue.clear_failed().await.unwrap();
        assert_eq!(queue.failed_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_result_round_trip() {
        let (_, queue) = queue();
        let record = JobRecord {
            job: Job::new("r".into(), "send", json!("payload"), 3),
            result: JobResult::ok(json!({ "sent": true })),
        };
        queue.save_result(&record).await.unwrap();

        let loaded: JobRecord<Value> = queue.result("r").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(queue.result::<Value>("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_job_moves_to_failed_queue() {
        let (store, queue) = queue();
        store.list_push_tail("queue:email", "not json".into()).await.unwrap();

        assert!(matches!(queue.dequeue::<Value>().await, Err(QueueError::Codec(_))));
        assert_eq!(queue.pending_len().await.unwrap(), 0);
        assert_eq!(queue.failed_len().await.unwrap(), 1);
        assert_eq!(
            store.list_pop_head("queue:email:failed").await.unwrap().as_deref(),
            Some("not json")
        );
    }
}
