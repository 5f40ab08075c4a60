//! Error types for pacer

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pacer operations
pub type PacerResult<T> = Result<T, PacerError>;

/// Main error type for pacer
#[derive(Error, Debug, Clone)]
pub enum PacerError {
    /// Timed out waiting for a token
    #[error("timed out waiting for a token after {waited:?}")]
    Timeout { waited: Duration },

    /// IO errors from the snapshot store
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<std::io::Error> for PacerError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for PacerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}
