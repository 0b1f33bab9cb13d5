//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

pub use streamlog::core::{Error, Event, EventStoreConfig, ReadCount, ReadFrom, RetryConfig};
pub use streamlog::{EventStore, MemoryStore};

/// An event store over its own in-memory backend
pub struct TestLog {
    pub store: Arc<MemoryStore>,
    pub events: EventStore<MemoryStore>,
}

impl TestLog {
    pub fn new() -> Self {
        Self::with_page_size(streamlog::storage::DEFAULT_PAGE_SIZE)
    }

    /// Small pages force reads across many continuation tokens
    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_config(page_size, test_config())
    }

    pub fn with_config(page_size: usize, config: EventStoreConfig) -> Self {
        let store = Arc::new(MemoryStore::with_page_size(page_size));
        store.create_event_tables(&config);
        let events = EventStore::builder()
            .shared_store(Arc::clone(&store))
            .config(config)
            .build()
            .unwrap();
        Self { store, events }
    }

    /// Append versions 1..=n to a stream, payload = version byte
    pub fn fill(&self, stream_id: &str, n: u64) -> Vec<u64> {
        (1..=n)
            .map(|v| {
                self.events
                    .append(stream_id, v, "Filled", vec![v as u8])
                    .unwrap()
            })
            .collect()
    }
}

/// Default config without allocator backoff
pub fn test_config() -> EventStoreConfig {
    EventStoreConfig {
        retry: RetryConfig::default().with_max_retries(10_000).no_delay(),
        ..EventStoreConfig::default()
    }
}

pub fn versions(events: &[Event]) -> Vec<u64> {
    events.iter().map(|e| e.version).collect()
}

pub fn positions(events: &[Event]) -> Vec<u64> {
    events.iter().map(|e| e.global_position).collect()
}
