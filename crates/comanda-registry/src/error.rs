//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Command rejected: {reason}")]
    CommandRejected { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
