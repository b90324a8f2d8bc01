//! Error types for sweep-dl
//!
//! Per-ID fetch problems never surface here: they resolve into a
//! [`FetchOutcome::Failed`](crate::types::FetchOutcome) inside the fetch worker.
//! This module covers the errors that can actually end a call into the library:
//! - Invalid configuration (with the offending key)
//! - HTTP client construction
//! - Record sink failures when the sink policy is `abort`
//! - Config file loading

use thiserror::Error;

/// Result type alias for sweep-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sweep-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent")
        key: Option<String>,
    },

    /// The HTTP client could not be built from the configuration
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record sink rejected a record and the sink policy is `abort`
    #[error("record sink error: {0}")]
    Sink(#[from] SinkError),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Errors raised by a [`RecordSink`](crate::sink::RecordSink)
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing or flushing the underlying storage failed
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be encoded
    #[error("failed to encode record {id}: {source}")]
    Encode {
        /// ID of the record that failed to encode
        id: u64,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The consumer side of the sink is gone
    #[error("sink closed: {0}")]
    Closed(String),
}
