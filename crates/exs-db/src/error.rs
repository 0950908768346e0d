use thiserror::Error;

/// Failure reading or writing study state.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<exs_srs::ParseError> for StoreError {
    fn from(err: exs_srs::ParseError) -> Self {
        Self::Corrupt(err.to_string())
    }
}
