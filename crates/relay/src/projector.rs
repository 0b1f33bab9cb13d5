//! Catch-up projector
//!
//! Feeds a handler every event after the consumer's checkpoint, in global
//! order, saving the checkpoint after each completed batch.
//!
//! Positions are allocated before events commit, so an append can become
//! visible below a position the projector has already passed. Consumers
//! that cannot tolerate that should lag the log tail.

use crate::checkpoint::CheckpointStore;
use crate::config::{RelayConfig, DEFAULT_BATCH_SIZE};
use crate::error::{RelayError, Result};
use std::fmt::Display;
use streamlog_core::{now_millis, Event, KeyRangeStore, ReadCount, ReadFrom};
use streamlog_engine::EventStore;
use tracing::{debug, info};

/// Replays the log into a handler from a saved checkpoint
pub struct Projector<S: ?Sized, C> {
    events: EventStore<S>,
    checkpoints: C,
    name: String,
    batch_size: usize,
}

impl<S: KeyRangeStore + ?Sized, C: CheckpointStore> Projector<S, C> {
    /// Create a projector for consumer `name`
    pub fn new(events: EventStore<S>, checkpoints: C, name: impl Into<String>) -> Self {
        Self {
            events,
            checkpoints,
            name: name.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Create a projector using the configured batch size
    pub fn from_config(
        events: EventStore<S>,
        checkpoints: C,
        name: impl Into<String>,
        config: &RelayConfig,
    ) -> Self {
        Self::new(events, checkpoints, name).with_batch_size(config.batch_size)
    }

    /// Events per batch (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Consumer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checkpoint store in use
    pub fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    /// Process everything after the checkpoint; returns events handled
    ///
    /// A handler error stops the run. The checkpoint stays at the last
    /// completed batch, so the failed batch is replayed next time.
    pub fn run<F, E>(&self, mut handler: F) -> Result<usize>
    where
        F: FnMut(&Event) -> std::result::Result<(), E>,
        E: Display,
    {
        let mut next = match self.checkpoints.load_checkpoint(&self.name)? {
            Some(cp) => ReadFrom::At(cp.position + 1),
            None => ReadFrom::Start,
        };
        let mut processed = 0;

        loop {
            let batch = self
                .events
                .read_all_forward(next, ReadCount::Limit(self.batch_size))?;
            let last = match batch.last() {
                Some(e) => e.global_position,
                None => break,
            };

            for event in &batch {
                handler(event).map_err(|e| RelayError::Handler {
                    position: event.global_position,
                    reason: e.to_string(),
                })?;
            }

            self.checkpoints
                .save_checkpoint(&self.name, last, now_millis())?;
            processed += batch.len();
            debug!(projection = %self.name, position = last, batch = batch.len(), "checkpointed");

            if batch.len() < self.batch_size {
                break;
            }
            next = ReadFrom::At(last + 1);
        }

        info!(projection = %self.name, processed, "projection caught up");
        Ok(processed)
    }
}
