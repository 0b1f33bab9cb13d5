//! # Streamlog
//!
//! Append-only event log with optimistic concurrency over an ordered
//! key-range store.
//!
//! Events are appended to named streams under an expected version and get a
//! gap-free global position shared across all streams. They read back per
//! stream or over the whole log, forward or backward, eagerly or page by
//! page.
//!
//! ## Quick Start
//!
//! ```ignore
//! use streamlog::prelude::*;
//!
//! let events = streamlog::in_memory(EventStoreConfig::default())?;
//!
//! let position = events.append("order-42", 1, "OrderPlaced", b"{}".to_vec())?;
//! let history = events.read_stream_forward("order-42", ReadFrom::Start, ReadCount::All)?;
//! ```
//!
//! ## Layers
//!
//! - [`core`]: event model, codec, errors, configuration, storage trait
//! - [`storage`]: [`MemoryStore`], the in-process backend
//! - [`engine`]: allocator, append and query engines, [`EventStore`]
//! - [`relay`]: checkpoints, projector and change relay

#![warn(missing_docs)]

pub mod prelude;

pub use streamlog_core as core;
pub use streamlog_engine as engine;
pub use streamlog_relay as relay;
pub use streamlog_storage as storage;

pub use streamlog_core::{Error, Event, EventStoreConfig, ReadCount, ReadFrom, Result};
pub use streamlog_engine::{EventPages, EventStore, EventStoreBuilder};
pub use streamlog_storage::MemoryStore;

/// Event store over a fresh [`MemoryStore`] with the configured tables
pub fn in_memory(config: EventStoreConfig) -> Result<EventStore<MemoryStore>> {
    let store = MemoryStore::for_event_store(&config);
    EventStore::builder().store(store).config(config).build()
}
