//! Short-lived string values with a time to live.
//!
//! Used for state that only matters while a learner is mid-session, such as
//! the queue and tally of an in-progress quiz.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};

use crate::error::StoreError;

/// Expiring key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Drop `key`. Returns whether a value was removed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Each entry lives for the ttl it was last written with.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process [`KeyValueStore`] on a moka cache with per-entry expiry.
///
/// Expired entries are evicted by the cache's housekeeping, so abandoned
/// sessions do not accumulate.
#[derive(Debug, Clone)]
pub struct MemoryKeyValueStore {
    entries: Cache<String, Entry>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(EntryTtl).build(),
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).await.is_some())
    }
}
