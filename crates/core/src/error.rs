//! Error types for streamlog
//!
//! Two layers:
//! - [`StoreError`]: what a [`KeyRangeStore`](crate::KeyRangeStore) reports
//! - [`Error`]: what the event store surfaces to its callers
//!
//! Condition failures are deliberately NOT converted by `From`: only the
//! caller that built the conditions knows what a failed condition means.

use thiserror::Error;

/// Errors reported by a backing store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write condition did not hold; nothing was written
    #[error("condition {condition_index} failed")]
    ConditionFailed {
        /// Index of the first failing condition in the request
        condition_index: usize,
    },

    /// The store could not be reached or refused service
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time; a write may or may not have happened
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that timed out
        operation: &'static str,
    },

    /// No such table
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// No such index on the table
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// The request is malformed for the table's key schema
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A continuation token could not be decoded
    #[error("invalid continuation token: {0}")]
    InvalidToken(String),
}

/// All streamlog errors.
///
/// This is the canonical error type for all event store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The expected version is already taken on the stream
    ///
    /// Re-read the stream and retry with a fresh expected version.
    #[error("version conflict: {stream_id} already has version {version}")]
    VersionConflict {
        /// Stream that was appended to
        stream_id: String,
        /// Version that was already taken
        version: u64,
    },

    /// The sequence allocator exhausted its retry budget
    #[error("sequence contention: gave up after {attempts} attempts")]
    SequenceContention {
        /// Number of compare-and-swap attempts made
        attempts: u32,
    },

    /// A global position collided despite allocation (bug)
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Transport or availability failure from the backing store
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A store round trip timed out; the outcome is unknown
    #[error("timeout during {operation}: outcome unknown")]
    Timeout {
        /// Operation that timed out
        operation: &'static str,
    },

    /// A stored record could not be decoded
    #[error("decode error on '{attribute}': {reason}")]
    Decode {
        /// Attribute that failed to decode
        attribute: String,
        /// What was wrong with it
        reason: String,
    },

    /// Caller passed an argument the store cannot act on
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for streamlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Version conflicts need a fresh expected version first; timeouts need
    /// a re-read since the write may have landed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::VersionConflict { .. } | Error::SequenceContention { .. } | Error::Timeout { .. }
        )
    }

    /// Check if this is a version conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict { .. })
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvariantViolation(_))
    }

    pub(crate) fn decode(attribute: &str, reason: impl Into<String>) -> Self {
        Error::Decode {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout { operation } => Error::Timeout { operation },
            StoreError::Unavailable(msg) => Error::StorageUnavailable(msg),
            StoreError::InvalidToken(msg) => Error::InvalidArgument(msg),
            // Unclassified condition failures and schema mismatches are
            // store-side misconfiguration from the caller's point of view.
            other => Error::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
