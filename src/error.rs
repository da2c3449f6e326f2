//! Error types for the media store.

use thiserror::Error;

/// Failure classes reported by owners (media elements, remote playback, ...).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OwnerError {
    /// The owner is not ready for the operation yet (e.g. no metadata loaded).
    #[error("owner is not ready")]
    NotReady,

    #[error("operation not allowed: {0}")]
    NotAllowed(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Owner error: {0}")]
    Owner(#[from] OwnerError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Unknown request type: {0}")]
    UnknownRequest(String),

    #[error("Value type mismatch: expected {expected}, got {got}")]
    ValueType { expected: &'static str, got: &'static str },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StoreError::Deserialization(e.to_string())
        } else {
            StoreError::Serialization(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
