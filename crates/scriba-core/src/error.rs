//! Error types for scriba.

use thiserror::Error;

/// Result type alias using scriba's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scriba operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger database operation failed (wraps sqlx::Error)
    #[error("Ledger error: {0}")]
    Ledger(#[from] sqlx::Error),

    /// Document store API call failed
    #[error("Document store error: {0}")]
    Store(String),

    /// Document not found in the document store
    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    /// AI provider call failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// A scan is already in flight
    #[error("Scan already running")]
    ScanInProgress,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
