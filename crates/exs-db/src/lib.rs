//! Storage boundary for exam-shelf.
//!
//! [`StudyStore`] is what the service layer talks to. [`PgStudyStore`] keeps
//! everything in PostgreSQL, [`MemoryStore`] keeps it in process for tests and
//! single-node tools. [`KeyValueStore`] holds short-lived session state.

pub mod error;
pub mod kv;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryKeyValueStore};
pub use memory::MemoryStore;
pub use models::{NewQuestion, ProgressRecord};
pub use postgres::PgStudyStore;
pub use store::StudyStore;

use anyhow::Context;
use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Ensure the database exists and run migrations in this crate's `migrations/` folder.
pub async fn ensure_db_and_migrate(database_url: &str, pool: &PgPool) -> Result<(), StoreError> {
    if !Postgres::database_exists(database_url).await? {
        tracing::info!("creating missing database");
        Postgres::create_database(database_url).await?;
    }

    sqlx::migrate!().run(pool).await?;
    tracing::info!("migrations applied");

    Ok(())
}
