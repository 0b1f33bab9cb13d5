//! Relay and projection errors

use thiserror::Error;

/// Errors from checkpointing, projection and queue relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Reading or decoding events failed
    #[error(transparent)]
    Event(#[from] streamlog_core::Error),

    /// A change record carried no new image
    #[error("change record {sequence} has no new image")]
    MissingImage {
        /// Feed sequence of the record
        sequence: u64,
    },

    /// No queue with this name
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// A queue refused a message
    #[error("publish to {queue} failed: {reason}")]
    Publish {
        /// Queue URL
        queue: String,
        /// Why it failed
        reason: String,
    },

    /// Message body could not be produced or parsed
    #[error("message encoding: {0}")]
    Message(String),

    /// Checkpoint persistence failed
    #[error("checkpoint store: {0}")]
    Checkpoint(String),

    /// The projection handler rejected an event
    #[error("handler failed at position {position}: {reason}")]
    Handler {
        /// Global position of the rejected event
        position: u64,
        /// Handler's error
        reason: String,
    },

    /// Relay configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Message(e.to_string())
    }
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
