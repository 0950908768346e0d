use std::sync::Arc;

use exs_db::StoreError;
use thiserror::Error;

use crate::{content::ContentError, retry::RetryError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    /// A storage failure seen by several callers waiting on the same load.
    #[error("Storage error: {0}")]
    SharedStore(Arc<StoreError>),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Content generation failed: {0}")]
    Content(#[from] RetryError<ContentError>),
    #[error("Session state error: {0}")]
    SessionState(#[from] serde_json::Error),
}

impl From<Arc<StoreError>> for ServiceError {
    fn from(err: Arc<StoreError>) -> Self {
        match Arc::try_unwrap(err) {
            Ok(err) => Self::Store(err),
            Err(shared) => Self::SharedStore(shared),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
