//! Error types for pixnote-core

use thiserror::Error;

/// Result type alias using pixnote-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pixnote-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote source unreachable or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Record absent from the remote source or the local mirror
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote record changed or disappeared between the local write and the remote write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Local mirror failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The remote source does not implement the requested operation
    #[error("Unsupported by remote source: {0}")]
    Unsupported(String),

    /// Superseded by a newer refresh
    #[error("Operation cancelled by a newer refresh")]
    Cancelled,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether an explicit user retry (pull-to-refresh, tap again) can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Conflict(_) | Self::Cancelled)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Storage(format!("mirror worker failed: {error}"))
    }
}
