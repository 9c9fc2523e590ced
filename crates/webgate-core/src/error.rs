//! Error types for `webgate` core library.

use thiserror::Error;

/// Result type alias using `webgate` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `webgate` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scenario description error
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Unknown event name
    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
