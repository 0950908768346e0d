//! Read-through cache with a fixed time to live.

use std::{fmt, future::Future, hash::Hash, sync::Arc, time::Duration};

use moka::future::Cache;

/// Entries a cache holds before the least recently used ones are evicted.
pub const DEFAULT_CAPACITY: u64 = 10_000;

enum LoadError<E> {
    Missing,
    Failed(Arc<E>),
}

/// Caches loaded values for `ttl`, bounded to a fixed number of entries.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Return the cached value or load, cache and return it.
    ///
    /// Concurrent misses on one key share a single load. `Ok(None)` from the
    /// loader is passed through and not cached.
    pub async fn get_or_try_load<Fut, E>(&self, key: K, load: Fut) -> Result<Option<V>, Arc<E>>
    where
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Send + Sync + 'static,
    {
        let outcome = self
            .inner
            .try_get_with(key, async move {
                match load.await {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(LoadError::Missing),
                    Err(err) => Err(LoadError::Failed(Arc::new(err))),
                }
            })
            .await;

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(err) => match err.as_ref() {
                LoadError::Missing => Ok(None),
                LoadError::Failed(err) => Err(Arc::clone(err)),
            },
        }
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
