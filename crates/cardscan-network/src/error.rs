//! Error types for event delivery.

use thiserror::Error;

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors that can occur while delivering an event.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the output stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The serial device could not be opened.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The HTTP client failed outside the retry loop.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Every delivery attempt failed at the transport level.
    #[error("Delivery failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// The background queue is full and the event was dropped.
    #[error("Event queue full")]
    QueueFull,

    /// The background worker has stopped.
    #[error("Event queue closed")]
    QueueClosed,
}

impl SinkError {
    /// Create a new HTTP error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Create a new retries exhausted error.
    pub fn retries_exhausted(attempts: u32, message: impl Into<String>) -> Self {
        Self::RetriesExhausted {
            attempts,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
