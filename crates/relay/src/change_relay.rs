//! Change relay
//!
//! Republishes newly committed events from a store's change feed onto every
//! configured queue, grouped by stream id so each stream stays ordered.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::message::EventMessage;
use crate::queue::{OutboundMessage, QueuePublisher};
use streamlog_core::{codec, ChangeKind, ChangeRecord};
use tracing::{debug, trace};
use uuid::Uuid;

/// Relays event-table inserts and modifications to queues
pub struct ChangeRelay<P> {
    publisher: P,
    queues: Vec<String>,
    event_table: String,
}

impl<P: QueuePublisher> ChangeRelay<P> {
    /// Relay `event_table` changes to `queues`
    pub fn new(publisher: P, event_table: impl Into<String>, queues: Vec<String>) -> Self {
        Self {
            publisher,
            queues,
            event_table: event_table.into(),
        }
    }

    /// Relay configured from a [`RelayConfig`]
    pub fn from_config(publisher: P, config: &RelayConfig) -> Self {
        Self::new(publisher, config.event_table.clone(), config.queues.clone())
    }

    /// The publisher messages go to
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Relay a batch of change records in order
    ///
    /// Returns the number of messages sent. The first failure stops the
    /// batch; records before it have already been sent.
    pub fn handle(&self, records: &[ChangeRecord]) -> Result<usize> {
        let mut sent = 0;
        for record in records {
            if record.table != self.event_table {
                trace!(table = %record.table, sequence = record.sequence, "skipping foreign table");
                continue;
            }
            match record.kind {
                ChangeKind::Insert | ChangeKind::Modify => sent += self.relay(record)?,
                ChangeKind::Remove => {}
            }
        }
        Ok(sent)
    }

    fn relay(&self, record: &ChangeRecord) -> Result<usize> {
        let image = record.new_image.as_ref().ok_or(RelayError::MissingImage {
            sequence: record.sequence,
        })?;
        let event = codec::decode(image)?;
        let body = EventMessage::encode(&event)?;

        for name in &self.queues {
            let queue_url = self.publisher.resolve_queue(name)?;
            self.publisher.send(OutboundMessage {
                id: Uuid::new_v4(),
                queue_url,
                group_id: event.stream_id.clone(),
                body: body.clone(),
            })?;
        }

        debug!(
            stream_id = %event.stream_id,
            position = event.global_position,
            queues = self.queues.len(),
            "relayed event"
        );
        Ok(self.queues.len())
    }
}
