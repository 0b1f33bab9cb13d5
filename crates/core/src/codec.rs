//! Event Record Codec
//!
//! Maps between [`Event`] and the store-native [`Item`]:
//!
//! | Event field | Attribute | Type |
//! |-------------|-----------|------|
//! | stream_id | `streamId` | S |
//! | version | `version` | N |
//! | global_position | `position` | N |
//! | committed_at | `committedAt` | N (ms) |
//! | event_type | `type` | S |
//! | payload | `eventData` | B |
//!
//! Every encoded event also carries `active = N(1)`, which is what places it
//! in the sparse global position index.
//!
//! Decoding is lenient about absence and strict about shape: a missing
//! attribute decodes to the zero value, an attribute of the wrong type or a
//! negative version/position is a [`Error::Decode`].

use crate::attribute::{AttributeValue, Item};
use crate::error::{Error, Result};
use crate::event::Event;

/// Attribute names used by the event table
pub mod attr {
    /// Stream id (table partition key)
    pub const STREAM_ID: &str = "streamId";
    /// Stream version (table sort key)
    pub const VERSION: &str = "version";
    /// Global position (index sort key)
    pub const POSITION: &str = "position";
    /// Commit timestamp
    pub const COMMITTED_AT: &str = "committedAt";
    /// Event type
    pub const EVENT_TYPE: &str = "type";
    /// Payload
    pub const EVENT_DATA: &str = "eventData";
    /// Index membership flag (index partition key)
    pub const ACTIVE: &str = "active";
    /// Counter name (counter table partition key)
    pub const COUNTER_NAME: &str = "name";
    /// Last value handed out by a counter
    pub const COUNTER_VALUE: &str = "value";
}

/// Value of the `active` attribute on every live event
pub const ACTIVE: i64 = 1;

/// Encode an event as a store item
///
/// # Errors
///
/// Returns `InvalidArgument` if the version or position does not fit the
/// store's signed numeric type.
pub fn encode(event: &Event) -> Result<Item> {
    let mut item = Item::new();
    item.insert(attr::STREAM_ID.into(), AttributeValue::S(event.stream_id.clone()));
    item.insert(attr::VERSION.into(), AttributeValue::N(to_number("version", event.version)?));
    item.insert(
        attr::POSITION.into(),
        AttributeValue::N(to_number("position", event.global_position)?),
    );
    item.insert(attr::COMMITTED_AT.into(), AttributeValue::N(event.committed_at));
    item.insert(attr::EVENT_TYPE.into(), AttributeValue::S(event.event_type.clone()));
    item.insert(attr::EVENT_DATA.into(), AttributeValue::B(event.payload.clone()));
    item.insert(attr::ACTIVE.into(), AttributeValue::N(ACTIVE));
    Ok(item)
}

/// Decode a store item into an event
pub fn decode(item: &Item) -> Result<Event> {
    Ok(Event {
        stream_id: string_attr(item, attr::STREAM_ID)?,
        version: unsigned_attr(item, attr::VERSION)?,
        global_position: unsigned_attr(item, attr::POSITION)?,
        committed_at: number_attr(item, attr::COMMITTED_AT)?,
        event_type: string_attr(item, attr::EVENT_TYPE)?,
        payload: bytes_attr(item, attr::EVENT_DATA)?,
    })
}

/// Primary key of an event row
pub fn stream_key(stream_id: &str, version: u64) -> Result<Item> {
    let mut key = Item::new();
    key.insert(attr::STREAM_ID.into(), AttributeValue::S(stream_id.to_string()));
    key.insert(attr::VERSION.into(), AttributeValue::N(to_number("version", version)?));
    Ok(key)
}

pub(crate) fn to_number(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} {} exceeds store range", field, value)))
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        None | Some(AttributeValue::Null) => Ok(String::new()),
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(other) => Err(Error::decode(name, format!("expected S, found {}", other.type_name()))),
    }
}

fn number_attr(item: &Item, name: &str) -> Result<i64> {
    match item.get(name) {
        None | Some(AttributeValue::Null) => Ok(0),
        Some(AttributeValue::N(n)) => Ok(*n),
        Some(other) => Err(Error::decode(name, format!("expected N, found {}", other.type_name()))),
    }
}

fn unsigned_attr(item: &Item, name: &str) -> Result<u64> {
    let n = number_attr(item, name)?;
    u64::try_from(n).map_err(|_| Error::decode(name, format!("negative value {}", n)))
}

fn bytes_attr(item: &Item, name: &str) -> Result<Vec<u8>> {
    match item.get(name) {
        None | Some(AttributeValue::Null) => Ok(Vec::new()),
        Some(AttributeValue::B(b)) => Ok(b.clone()),
        Some(other) => Err(Error::decode(name, format!("expected B, found {}", other.type_name()))),
    }
}
