use std::time::Duration;

use serde::Deserialize;

/// Deployment environment, drives log formatting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Service settings, read from `EXS_*` environment variables.
///
/// `EXS_DATABASE_URL` is the only required variable.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub env: Environment,
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Default review queue length
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,
    /// Default number of questions in a mock exam
    #[serde(default = "default_exam_total")]
    pub exam_total: u32,
    #[serde(default = "default_topic_cache_ttl_secs")]
    pub topic_cache_ttl_secs: u64,
    /// How long an in-progress quiz survives without activity
    #[serde(default = "default_session_state_ttl_secs")]
    pub session_state_ttl_secs: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Topics generated in parallel when topping up an exam
    #[serde(default = "default_generation_concurrency")]
    pub generation_concurrency: usize,
    /// Generate a follow-up question after each incorrect training answer
    #[serde(default = "default_generate_follow_ups")]
    pub generate_follow_ups: bool,
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_queue_limit() -> usize {
    20
}

const fn default_exam_total() -> u32 {
    20
}

const fn default_topic_cache_ttl_secs() -> u64 {
    300
}

const fn default_session_state_ttl_secs() -> u64 {
    86_400
}

const fn default_retry_max_attempts() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    500
}

const fn default_generation_concurrency() -> usize {
    3
}

const fn default_generate_follow_ups() -> bool {
    true
}

impl ServiceConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load from explicit `(key, value)` pairs using the same `EXS_` prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("EXS_").from_iter(vars)
    }

    /// Config for tests and embedded use with every default applied.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            env: Environment::default(),
            database_url: database_url.into(),
            max_connections: default_max_connections(),
            queue_limit: default_queue_limit(),
            exam_total: default_exam_total(),
            topic_cache_ttl_secs: default_topic_cache_ttl_secs(),
            session_state_ttl_secs: default_session_state_ttl_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            generation_concurrency: default_generation_concurrency(),
            generate_follow_ups: default_generate_follow_ups(),
        }
    }

    pub const fn topic_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.topic_cache_ttl_secs)
    }

    pub const fn session_state_ttl(&self) -> Duration {
        Duration::from_secs(self.session_state_ttl_secs)
    }

    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
