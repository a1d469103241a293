//! In-process queue store for development and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{KvListStore, StoreError};

#[derive(Debug)]
struct Expiring {
    value: String,
    expires_at: Instant,
}

/// Lists and TTL values held in memory.
///
/// `set_available(false)` makes every command fail with
/// [`StoreError::Unavailable`] until availability is restored.
#[derive(Debug)]
pub struct MemoryStore {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    values: Mutex<HashMap<String, Expiring>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            lists: Mutex::new(HashMap::new()),
            values: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unavailable".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvListStore for MemoryStore {
    async fn list_push_tail(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.check()?;
        self.lists
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(value);
        Ok(())
    }

    async fn list_pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(key) else {
            return Ok(None);
        };
        let value = list.pop_front();
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(value)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        self.check()?;
        Ok(self.lists.lock().get(key).map_or(0, VecDeque::len))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.check()?;
        self.values.lock().insert(
            key.to_string(),
            Expiring {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        let mut values = self.values.lock();
        match values.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.lists.lock().remove(key);
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_fifo() {
        let store = MemoryStore::new();
        store.list_push_tail("queue:email", "a".into()).await.unwrap();
        store.list_push_tail("queue:email", "b".into()).await.unwrap();

        assert_eq!(store.list_len("queue:email").await.unwrap(), 2);
        assert_eq!(store.list_pop_head("queue:email").await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.list_pop_head("queue:email").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.list_pop_head("queue:email").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_expire() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("job:result:1", "{}".into(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(store.get("job:result:1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("job:result:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_command() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(
            store.list_pop_head("queue:email").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.list_push_tail("queue:email", "x".into()).await.is_err());

        store.set_available(true);
        assert!(store.list_push_tail("queue:email", "x".into()).await.is_ok());
    }
}
