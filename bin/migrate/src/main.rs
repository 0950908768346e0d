use exs_service::{ServiceConfig, tracing::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    let config = ServiceConfig::from_env()?;
    init_tracing(&config.env)?;

    // Create the database if needed and apply pending migrations
    let pool = exs_db::create_pool(&config.database_url, config.max_connections).await?;
    exs_db::ensure_db_and_migrate(&config.database_url, &pool).await?;

    tracing::info!(max_connections = config.max_connections, "Database is up to date");
    pool.close().await;

    Ok(())
}
