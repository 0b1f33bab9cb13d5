//! Event types for the append-only log
//!
//! These types define the logical shape of an event and the bounds used to
//! read ranges of them back.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Raw sentinel for "from the start" (before version/position 1)
pub const POSITION_START: i64 = 0;
/// Raw sentinel for "from the end" (after the last version/position)
pub const POSITION_END: i64 = -1;
/// Raw sentinel for "no limit on the number of events"
pub const COUNT_ALL: i64 = -1;

/// An event in the log
///
/// Events are immutable records. Each event includes:
/// - Its stream and 1-based version within that stream
/// - A 1-based global position, unique and gap-free across all streams
/// - A server-assigned commit timestamp
/// - A user-defined type and an opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Stream the event belongs to
    pub stream_id: String,
    /// Position within the stream (1-based)
    pub version: u64,
    /// Position within the whole log (1-based)
    pub global_position: u64,
    /// Commit time (milliseconds since epoch)
    pub committed_at: i64,
    /// Event type (application-defined)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload (opaque to the store)
    pub payload: Vec<u8>,
}

/// Where a range read begins
///
/// Both `Start` and `End` are out-of-band: they never collide with a real
/// version or position, which are always >= 1. `At(n)` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadFrom {
    /// Before the first event
    Start,
    /// After the last event
    End,
    /// At the given version or global position (inclusive)
    At(u64),
}

impl ReadFrom {
    /// Convert from the raw numeric form (`0` = start, `-1` = end)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other negative value.
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            POSITION_START => Ok(ReadFrom::Start),
            POSITION_END => Ok(ReadFrom::End),
            n if n > 0 => Ok(ReadFrom::At(n as u64)),
            n => Err(Error::InvalidArgument(format!("invalid read start: {}", n))),
        }
    }
}

/// How many events a range read returns at most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadCount {
    /// Read until the range is exhausted
    All,
    /// Read at most this many events; `Limit(0)` means none
    Limit(usize),
}

impl ReadCount {
    /// Convert from the raw numeric form (`-1` = all, `n >= 0` = limit)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other negative value.
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            COUNT_ALL => Ok(ReadCount::All),
            n if n >= 0 => Ok(ReadCount::Limit(n as usize)),
            n => Err(Error::InvalidArgument(format!("invalid read count: {}", n))),
        }
    }

    /// The limit, if any
    pub fn limit(&self) -> Option<usize> {
        match self {
            ReadCount::All => None,
            ReadCount::Limit(n) => Some(*n),
        }
    }

    /// How many more events are wanted after `have` were collected
    pub fn remaining(&self, have: usize) -> Option<usize> {
        self.limit().map(|n| n.saturating_sub(have))
    }

    /// Whether `have` events already satisfy this count
    pub fn is_satisfied_by(&self, have: usize) -> bool {
        matches!(self.remaining(have), Some(0))
    }
}

/// Current time in milliseconds since epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
