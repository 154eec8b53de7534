//! Error types for Solera.

use thiserror::Error;

/// Common error type for Solera.
#[derive(Error, Debug)]
pub enum SoleraError {
    /// Database error.
    ///
    /// Wraps errors from the underlying SQLite driver.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for SoleraError {
    fn from(e: rusqlite::Error) -> Self {
        SoleraError::Database(e.to_string())
    }
}

/// Result type alias for Solera operations.
pub type Result<T> = std::result::Result<T, SoleraError>;
