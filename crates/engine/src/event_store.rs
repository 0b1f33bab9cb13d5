//! Event store facade
//!
//! [`EventStore`] bundles the append and query engines over one shared
//! store handle. It holds no locks and is cheap to clone; every clone talks
//! to the same store.
//!
//! # Example
//!
//! ```ignore
//! use streamlog_engine::EventStore;
//! use streamlog_core::{ReadCount, ReadFrom};
//!
//! let events = EventStore::builder().store(store).build()?;
//! let position = events.append("order-42", 1, "OrderPlaced", b"{}".to_vec())?;
//! let history = events.read_stream_forward("order-42", ReadFrom::Start, ReadCount::All)?;
//! ```

use crate::append::AppendEngine;
use crate::query::{EventPages, RangeQueryEngine};
use std::sync::Arc;
use streamlog_core::{Error, Event, EventStoreConfig, KeyRangeStore, ReadCount, ReadFrom, Result};

/// Append-only event log over a [`KeyRangeStore`]
pub struct EventStore<S: ?Sized> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: ?Sized> {
    config: EventStoreConfig,
    append: AppendEngine<S>,
    query: RangeQueryEngine<S>,
}

impl<S: ?Sized> Clone for EventStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyRangeStore + ?Sized> EventStore<S> {
    /// Start building an event store
    pub fn builder() -> EventStoreBuilder<S> {
        EventStoreBuilder::new()
    }

    /// Create an event store over a shared store handle
    pub fn new(store: Arc<S>, config: EventStoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                append: AppendEngine::new(Arc::clone(&store), &config),
                query: RangeQueryEngine::new(store, &config),
                config,
            }),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &EventStoreConfig {
        &self.inner.config
    }

    /// Append an event at `expected_version` and return its global position
    ///
    /// See [`AppendEngine::append`] for the failure modes.
    pub fn append(
        &self,
        stream_id: &str,
        expected_version: u64,
        event_type: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<u64> {
        self.inner
            .append
            .append(stream_id, expected_version, event_type, payload.into())
    }

    /// Events of one stream from `from` upwards
    pub fn read_stream_forward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<Vec<Event>> {
        self.inner.query.read_stream_forward(stream_id, from, count)
    }

    /// Events of one stream from `from` downwards
    pub fn read_stream_backward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<Vec<Event>> {
        self.inner.query.read_stream_backward(stream_id, from, count)
    }

    /// All events from global position `from` upwards
    pub fn read_all_forward(&self, from: ReadFrom, count: ReadCount) -> Result<Vec<Event>> {
        self.inner.query.read_all_forward(from, count)
    }

    /// All events from global position `from` downwards
    pub fn read_all_backward(&self, from: ReadFrom, count: ReadCount) -> Result<Vec<Event>> {
        self.inner.query.read_all_backward(from, count)
    }

    /// Lazily read one stream upwards
    pub fn stream_forward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<EventPages<S>> {
        self.inner.query.stream_forward(stream_id, from, count)
    }

    /// Lazily read one stream downwards
    pub fn stream_backward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<EventPages<S>> {
        self.inner.query.stream_backward(stream_id, from, count)
    }

    /// Lazily read the whole log upwards
    pub fn all_forward(&self, from: ReadFrom, count: ReadCount) -> EventPages<S> {
        self.inner.query.all_forward(from, count)
    }

    /// Lazily read the whole log downwards
    pub fn all_backward(&self, from: ReadFrom, count: ReadCount) -> EventPages<S> {
        self.inner.query.all_backward(from, count)
    }

    /// Global position of the newest committed event
    ///
    /// Reads the log tail, so it can trail the sequence counter while
    /// appends are in flight.
    pub fn last_position(&self) -> Result<Option<u64>> {
        Ok(self
            .read_all_backward(ReadFrom::End, ReadCount::Limit(1))?
            .first()
            .map(|e| e.global_position))
    }

    /// Newest event of a stream
    pub fn stream_head(&self, stream_id: &str) -> Result<Option<Event>> {
        Ok(self
            .read_stream_backward(stream_id, ReadFrom::End, ReadCount::Limit(1))?
            .into_iter()
            .next())
    }

    /// Version to pass as `expected_version` for the next append
    pub fn next_version(&self, stream_id: &str) -> Result<u64> {
        Ok(self.stream_head(stream_id)?.map_or(1, |e| e.version + 1))
    }
}

/// Builder for [`EventStore`]
pub struct EventStoreBuilder<S: ?Sized> {
    store: Option<Arc<S>>,
    config: EventStoreConfig,
}

impl<S: KeyRangeStore + ?Sized> EventStoreBuilder<S> {
    fn new() -> Self {
        Self {
            store: None,
            config: EventStoreConfig::default(),
        }
    }

    /// Use a shared store handle
    pub fn shared_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this configuration instead of the defaults
    pub fn config(mut self, config: EventStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the event store
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if no store was given
    /// - `Config` if a table, index or counter name is empty
    pub fn build(self) -> Result<EventStore<S>> {
        let store = self
            .store
            .ok_or_else(|| Error::InvalidArgument("event store requires a store".into()))?;

        let names = [
            ("event_table", &self.config.event_table),
            ("position_index", &self.config.position_index),
            ("counter_table", &self.config.counter_table),
            ("counter_name", &self.config.counter_name),
        ];
        if let Some((field, _)) = names.iter().find(|(_, v)| v.is_empty()) {
            return Err(Error::Config(format!("{} must not be empty", field)));
        }

        Ok(EventStore::new(store, self.config))
    }
}

impl<S: KeyRangeStore> EventStoreBuilder<S> {
    /// Use this store
    pub fn store(self, store: S) -> Self {
        self.shared_store(Arc::new(store))
    }
}
