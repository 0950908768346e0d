use std::sync::Arc;

use exs_db::{KeyValueStore, MemoryKeyValueStore, PgStudyStore, StudyStore};
use exs_srs::TopicMeta;
use uuid::Uuid;

use crate::{
    cache::TtlCache, config::ServiceConfig, content::ContentSource, error::ServiceError,
    pool::BoundedPool, retry::RetryPolicy,
};

/// Shared handles every operation runs against.
#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<dyn StudyStore>,
    pub kv: Arc<dyn KeyValueStore>,
    pub content: Arc<dyn ContentSource>,
    pub topic_cache: TtlCache<Uuid, TopicMeta>,
    pub retry_policy: RetryPolicy,
    pub generation_pool: BoundedPool,
    pub config: ServiceConfig,
}

impl std::fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("content", &self.content.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServiceState {
    /// Assemble state from explicit backends.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn StudyStore>,
        kv: Arc<dyn KeyValueStore>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            topic_cache: TtlCache::new(config.topic_cache_ttl()),
            retry_policy: RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay()),
            generation_pool: BoundedPool::new(config.generation_concurrency),
            store,
            kv,
            content,
            config,
        }
    }

    /// Connect to PostgreSQL, run migrations and keep session state in process.
    pub async fn connect(config: ServiceConfig, content: Arc<dyn ContentSource>) -> anyhow::Result<Self> {
        let pool = exs_db::create_pool(&config.database_url, config.max_connections).await?;
        exs_db::ensure_db_and_migrate(&config.database_url, &pool).await?;

        tracing::info!(
            max_connections = config.max_connections,
            content_source = content.name(),
            "Service state ready"
        );

        Ok(Self::new(
            config,
            Arc::new(PgStudyStore::new(pool)),
            Arc::new(MemoryKeyValueStore::new()),
            content,
        ))
    }

    /// Topic metadata through the TTL cache.
    pub async fn topic_meta(&self, topic_id: Uuid) -> Result<Option<TopicMeta>, ServiceError> {
        let meta = self
            .topic_cache
            .get_or_try_load(topic_id, self.store.topic_meta(topic_id))
            .await?;
        Ok(meta)
    }
}
