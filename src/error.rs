//! Quoted Search Error Types
//!
//! Centralized error handling for the coordination core.

use thiserror::Error;

/// Central error type for the quoted-search core
#[derive(Error, Debug)]
pub enum QsError {
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Menu error: {0}")]
    Menu(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for quoted-search operations
pub type QsResult<T> = Result<T, QsError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for QsError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        QsError::Lock(err.to_string())
    }
}
