//! Queue message body
//!
//! Events travel as JSON with the payload as base64 text:
//!
//! ```json
//! {"streamId":"order-42","version":1,"globalPosition":7,
//!  "committedAt":1700000000000,"type":"OrderPlaced","payload":"WA=="}
//! ```

use crate::error::{RelayError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use streamlog_core::Event;

/// Wire form of an event on a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    /// Stream id
    pub stream_id: String,
    /// Version within the stream
    pub version: u64,
    /// Global position
    pub global_position: u64,
    /// Commit time in milliseconds
    pub committed_at: i64,
    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,
    /// Base64 payload
    pub payload: String,
}

impl EventMessage {
    /// Serialize an event as a message body
    pub fn encode(event: &Event) -> Result<String> {
        Ok(serde_json::to_string(&EventMessage::from(event))?)
    }

    /// Parse a message body back into an event
    pub fn decode(body: &str) -> Result<Event> {
        let message: EventMessage = serde_json::from_str(body)?;
        message.into_event()
    }

    /// Convert to an event, decoding the payload
    pub fn into_event(self) -> Result<Event> {
        let payload = STANDARD
            .decode(&self.payload)
            .map_err(|e| RelayError::Message(format!("payload: {}", e)))?;
        Ok(Event {
            stream_id: self.stream_id,
            version: self.version,
            global_position: self.global_position,
            committed_at: self.committed_at,
            event_type: self.event_type,
            payload,
        })
    }
}

impl From<&Event> for EventMessage {
    fn from(event: &Event) -> Self {
        Self {
            stream_id: event.stream_id.clone(),
            version: event.version,
            global_position: event.global_position,
            committed_at: event.committed_at,
            event_type: event.event_type.clone(),
            payload: STANDARD.encode(&event.payload),
        }
    }
}
