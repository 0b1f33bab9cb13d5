//! Fault-injecting stores for unit tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use streamlog_core::codec::attr;
use streamlog_core::{
    AttributeValue, EventStoreConfig, GetRequest, Item, KeyRangeStore, PutRequest, QueryPage,
    QueryRequest, RetryConfig, StoreError, UpdateRequest,
};
use streamlog_storage::MemoryStore;

pub(crate) fn config() -> EventStoreConfig {
    EventStoreConfig {
        retry: RetryConfig::default().no_delay(),
        ..EventStoreConfig::default()
    }
}

/// A store where another writer bumps the counter right before each of the
/// next `races` counter updates, so those updates lose their CAS
pub(crate) struct RacingStore {
    inner: MemoryStore,
    races: AtomicU32,
}

impl RacingStore {
    pub fn new(races: u32) -> Self {
        Self {
            inner: MemoryStore::for_event_store(&config()),
            races: AtomicU32::new(races),
        }
    }

    pub fn races_left(&self) -> u32 {
        self.races.load(Ordering::SeqCst)
    }

    fn race(&self, key: &Item) -> Result<(), StoreError> {
        let current = self
            .inner
            .get(GetRequest::new("counters", key.clone()))?
            .and_then(|item| item.get(attr::COUNTER_VALUE).and_then(|v| v.as_number()))
            .unwrap_or(0);
        self.inner.update(
            UpdateRequest::new("counters", key.clone())
                .set(attr::COUNTER_VALUE, AttributeValue::N(current + 1)),
        )?;
        Ok(())
    }
}

impl KeyRangeStore for RacingStore {
    fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        self.inner.put(request)
    }

    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        self.inner.get(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError> {
        let lose = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            self.race(&request.key)?;
        }
        self.inner.update(request)
    }

    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        self.inner.query(request)
    }
}

/// A store that ignores query limits and counts round trips
pub(crate) struct OverfetchStore {
    pub inner: MemoryStore,
    pub queries: AtomicU32,
}

impl OverfetchStore {
    pub fn new(page_size: usize) -> Self {
        let inner = MemoryStore::with_page_size(page_size);
        inner.create_event_tables(&config());
        Self {
            inner,
            queries: AtomicU32::new(0),
        }
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

impl KeyRangeStore for OverfetchStore {
    fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        self.inner.put(request)
    }

    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        self.inner.get(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError> {
        self.inner.update(request)
    }

    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(request.limit(None))
    }
}

/// A store whose event writes fail with a scripted error
pub(crate) struct FailingPutStore {
    pub inner: MemoryStore,
    pub error: Mutex<Option<StoreError>>,
}

impl FailingPutStore {
    pub fn new(error: StoreError) -> Self {
        Self {
            inner: MemoryStore::for_event_store(&config()),
            error: Mutex::new(Some(error)),
        }
    }
}

impl KeyRangeStore for FailingPutStore {
    fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        if request.table == "events" {
            if let Some(e) = self.error.lock().take() {
                return Err(e);
            }
        }
        self.inner.put(request)
    }

    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        self.inner.get(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError> {
        self.inner.update(request)
    }

    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        self.inner.query(request)
    }
}
