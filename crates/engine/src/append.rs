//! Append Engine
//!
//! One append is:
//! 1. a consistent point read of `(stream_id, expected_version)`; an existing
//!    row is a version conflict and no position is allocated
//! 2. a global position from the [`SequenceAllocator`]
//! 3. a conditional put guarded by "version slot is free" (condition 0) and,
//!    with `position_guard`, "position is free" (condition 1)
//!
//! A failed guard is classified by its index. Condition 0 means another
//! writer took the version; condition 1 means the allocator handed out a
//! position twice, which is a bug and is never retried.

use crate::allocator::SequenceAllocator;
use std::sync::Arc;
use streamlog_core::codec::{self, ACTIVE};
use streamlog_core::{
    now_millis, AttributeValue, Condition, Error, Event, EventStoreConfig, GetRequest,
    KeyRangeStore, PutRequest, RequestOptions, Result, StoreError,
};
use tracing::{debug, error, warn};

const VERSION_GUARD: usize = 0;
const POSITION_GUARD: usize = 1;

/// Writes events under optimistic concurrency
pub struct AppendEngine<S: ?Sized> {
    store: Arc<S>,
    allocator: SequenceAllocator<S>,
    event_table: String,
    position_index: String,
    position_guard: bool,
    options: RequestOptions,
}

impl<S: KeyRangeStore + ?Sized> AppendEngine<S> {
    /// Create an append engine with its own allocator
    pub fn new(store: Arc<S>, config: &EventStoreConfig) -> Self {
        Self {
            allocator: SequenceAllocator::new(Arc::clone(&store), config),
            store,
            event_table: config.event_table.clone(),
            position_index: config.position_index.clone(),
            position_guard: config.position_guard,
            options: RequestOptions::with_timeout(config.request_timeout()),
        }
    }

    /// The allocator this engine draws positions from
    pub fn allocator(&self) -> &SequenceAllocator<S> {
        &self.allocator
    }

    /// Append one event at `expected_version` and return its global position
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty stream id or event type, or version 0
    /// - `VersionConflict` if the version is taken; re-read and retry
    /// - `SequenceContention` if the allocator gave up
    /// - `InvariantViolation` if the allocated position already exists
    /// - `Timeout`: the event may or may not have been written
    pub fn append(
        &self,
        stream_id: &str,
        expected_version: u64,
        event_type: &str,
        payload: Vec<u8>,
    ) -> Result<u64> {
        validate(stream_id, expected_version, event_type)?;

        if self.version_taken(stream_id, expected_version)? {
            warn!(stream_id, version = expected_version, "version already taken");
            return Err(conflict(stream_id, expected_version));
        }

        let position = self.allocator.allocate()?;
        let event = Event {
            stream_id: stream_id.to_string(),
            version: expected_version,
            global_position: position,
            committed_at: now_millis(),
            event_type: event_type.to_string(),
            payload,
        };

        let mut request = PutRequest::new(self.event_table.clone(), codec::encode(&event)?)
            .condition(Condition::ItemNotExists)
            .options(self.options);
        if self.position_guard {
            request = request.condition(Condition::IndexKeyNotExists {
                index: self.position_index.clone(),
                partition: AttributeValue::N(ACTIVE),
                sort: i64::try_from(position).map_err(|_| {
                    Error::InvariantViolation(format!("position {} out of range", position))
                })?,
            });
        }

        match self.store.put(request) {
            Ok(()) => {
                debug!(stream_id, version = expected_version, position, "appended event");
                Ok(position)
            }
            Err(StoreError::ConditionFailed {
                condition_index: VERSION_GUARD,
            }) => {
                // Lost the race after the pre-check; the position is burned.
                warn!(
                    stream_id,
                    version = expected_version,
                    position,
                    "version taken by concurrent writer"
                );
                Err(conflict(stream_id, expected_version))
            }
            Err(StoreError::ConditionFailed {
                condition_index: POSITION_GUARD,
            }) => {
                error!(
                    stream_id,
                    version = expected_version,
                    position,
                    "allocated position already exists"
                );
                Err(Error::InvariantViolation(format!(
                    "global position {} allocated twice",
                    position
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn version_taken(&self, stream_id: &str, version: u64) -> Result<bool> {
        let request = GetRequest::new(self.event_table.clone(), codec::stream_key(stream_id, version)?)
            .options(self.options);
        Ok(self.store.get(request)?.is_some())
    }
}

fn validate(stream_id: &str, expected_version: u64, event_type: &str) -> Result<()> {
    if stream_id.is_empty() {
        return Err(Error::InvalidArgument("stream id must not be empty".into()));
    }
    if event_type.is_empty() {
        return Err(Error::InvalidArgument("event type must not be empty".into()));
    }
    if expected_version == 0 {
        return Err(Error::InvalidArgument("versions start at 1".into()));
    }
    Ok(())
}

fn conflict(stream_id: &str, version: u64) -> Error {
    Error::VersionConflict {
        stream_id: stream_id.to_string(),
        version,
    }
}
