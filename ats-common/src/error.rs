//! Common error types for ATS

use thiserror::Error;

/// Common result type for ATS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ATS services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding or decoding of a stored document failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (e.g. a second response for one participant)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
