//! In-memory ordered key-range store
//!
//! # Design
//!
//! - DashMap: table name -> table, lock-free lookup
//! - Per-table RwLock: conditional writes evaluate and apply under one
//!   write guard, so a condition can never be invalidated between check and
//!   write
//! - Different tables never contend
//!
//! The change feed keeps its records and its sequence counter under one
//! mutex, so feed order is sequence order across tables. Consumers drop
//! records they have checkpointed with [`MemoryStore::trim_through`].
//!
//! Every request honours its [`RequestOptions::timeout`] when waiting for a
//! table lock, and fails with [`StoreError::Timeout`] if the wait runs out.
//!
//! # Example
//!
//! ```ignore
//! use streamlog_storage::MemoryStore;
//! use streamlog_core::EventStoreConfig;
//!
//! let store = MemoryStore::for_event_store(&EventStoreConfig::default());
//! ```

use crate::table::Table;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamlog_core::codec::attr;
use streamlog_core::{
    ChangeKind, ChangeRecord, EventStoreConfig, GetRequest, IndexSchema, Item, KeyRangeStore,
    PutRequest, QueryPage, QueryRequest, RequestOptions, StoreError, TableSchema, UpdateRequest,
};
use tracing::{debug, trace};

/// Default maximum rows per query page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory implementation of [`KeyRangeStore`]
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - Table lookup: lock-free via DashMap
/// - Reads: shared lock on the target table
/// - Writes: exclusive lock on the target table only
pub struct MemoryStore {
    /// Tables by name
    tables: DashMap<String, Arc<RwLock<Table>>>,
    /// Maximum rows per query page
    page_size: usize,
    /// When false every request fails with `Unavailable`
    available: AtomicBool,
    /// Committed writes in commit order
    feed: Mutex<Feed>,
}

/// Change feed records plus the sequence the next record gets
struct Feed {
    records: VecDeque<ChangeRecord>,
    next_sequence: u64,
}

impl MemoryStore {
    /// Create an empty store with no tables
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store with a custom page size
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            tables: DashMap::new(),
            page_size: page_size.max(1),
            available: AtomicBool::new(true),
            feed: Mutex::new(Feed {
                records: VecDeque::new(),
                next_sequence: 1,
            }),
        }
    }

    /// Create a store with the event and counter tables the event store expects
    pub fn for_event_store(config: &EventStoreConfig) -> Self {
        let store = Self::new();
        store.create_event_tables(config);
        store
    }

    /// Create the event table (with its position index) and the counter table
    ///
    /// Existing tables are left untouched.
    pub fn create_event_tables(&self, config: &EventStoreConfig) {
        let events = TableSchema::new(config.event_table.clone(), attr::STREAM_ID)
            .sort_key(attr::VERSION)
            .index(IndexSchema::new(
                config.position_index.clone(),
                attr::ACTIVE,
                attr::POSITION,
            ));
        let counters = TableSchema::new(config.counter_table.clone(), attr::COUNTER_NAME);

        for schema in [events, counters] {
            if !self.insert_table(schema) {
                trace!("event store table already present");
            }
        }
    }

    /// Create a table
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if a table with that name exists.
    pub fn create_table(&self, schema: TableSchema) -> Result<(), StoreError> {
        let name = schema.name.clone();
        if self.insert_table(schema) {
            Ok(())
        } else {
            Err(StoreError::InvalidRequest(format!(
                "table '{}' already exists",
                name
            )))
        }
    }

    /// Key layout of a table
    pub fn describe_table(&self, name: &str) -> Option<TableSchema> {
        self.tables
            .get(name)
            .map(|t| t.value().read().schema().clone())
    }

    /// Number of rows in a table
    pub fn table_len(&self, name: &str) -> usize {
        self.tables
            .get(name)
            .map(|t| t.value().read().len())
            .unwrap_or(0)
    }

    /// Maximum rows per query page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Take the store offline (or bring it back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Change records with `sequence > after`, oldest first, at most `max`
    pub fn changes_since(&self, after: u64, max: usize) -> Vec<ChangeRecord> {
        let feed = self.feed.lock();
        let start = feed.records.partition_point(|r| r.sequence <= after);
        feed.records.range(start..).take(max).cloned().collect()
    }

    /// Drop change records with `sequence <= through`; returns how many
    ///
    /// Call once every consumer has checkpointed past `through`.
    pub fn trim_through(&self, through: u64) -> usize {
        let mut feed = self.feed.lock();
        let end = feed.records.partition_point(|r| r.sequence <= through);
        feed.records.drain(..end);
        if end > 0 {
            debug!(through, dropped = end, "trimmed change feed");
        }
        end
    }

    /// Number of change records retained
    pub fn feed_len(&self) -> usize {
        self.feed.lock().records.len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Insert a table unless one with that name exists; true if inserted
    fn insert_table(&self, schema: TableSchema) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.tables.entry(schema.name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(table = %schema.name, indexes = schema.indexes.len(), "created table");
                slot.insert(Arc::new(RwLock::new(Table::new(schema))));
                true
            }
        }
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    fn table(&self, name: &str) -> Result<Arc<RwLock<Table>>, StoreError> {
        self.ensure_available()?;
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn read_lock<'a>(
        table: &'a RwLock<Table>,
        options: RequestOptions,
        operation: &'static str,
    ) -> Result<RwLockReadGuard<'a, Table>, StoreError> {
        match options.timeout {
            Some(timeout) => table
                .try_read_for(timeout)
                .ok_or(StoreError::Timeout { operation }),
            None => Ok(table.read()),
        }
    }

    fn write_lock<'a>(
        table: &'a RwLock<Table>,
        options: RequestOptions,
        operation: &'static str,
    ) -> Result<RwLockWriteGuard<'a, Table>, StoreError> {
        match options.timeout {
            Some(timeout) => table
                .try_write_for(timeout)
                .ok_or(StoreError::Timeout { operation }),
            None => Ok(table.write()),
        }
    }

    /// Append to the change feed; called with the table write guard held
    fn record_change(&self, table: &Table, keys: Item, old: Option<Item>, new: Item) {
        let kind = if old.is_some() {
            ChangeKind::Modify
        } else {
            ChangeKind::Insert
        };
        let mut feed = self.feed.lock();
        let sequence = feed.next_sequence;
        feed.next_sequence += 1;
        feed.records.push_back(ChangeRecord {
            sequence,
            table: table.schema().name.clone(),
            kind,
            keys,
            old_image: old,
            new_image: Some(new),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRangeStore for MemoryStore {
    fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        let table = self.table(&request.table)?;
        let mut guard = Self::write_lock(&table, request.options, "put")?;

        let key = guard.primary_key(&request.item)?;
        if let Err(e) = guard.check(&key, &request.conditions) {
            trace!(table = %request.table, error = %e, "put rejected");
            return Err(e);
        }

        let keys = guard.key_item(&key);
        let old = guard.write(key, request.item.clone())?;
        self.record_change(&guard, keys, old, request.item);
        trace!(table = %request.table, "put");
        Ok(())
    }

    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        let table = self.table(&request.table)?;
        let guard = Self::read_lock(&table, request.options, "get")?;
        let key = guard.primary_key(&request.key)?;
        Ok(guard.get(&key).cloned())
    }

    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError> {
        let table = self.table(&request.table)?;
        let mut guard = Self::write_lock(&table, request.options, "update")?;

        let key = guard.primary_key(&request.key)?;
        let schema = guard.schema();
        if request
            .set
            .keys()
            .any(|name| *name == schema.partition_key || Some(name) == schema.sort_key.as_ref())
        {
            return Err(StoreError::InvalidRequest(
                "update cannot assign key attributes".to_string(),
            ));
        }
        if let Err(e) = guard.check(&key, &request.conditions) {
            trace!(table = %request.table, error = %e, "update rejected");
            return Err(e);
        }

        let mut item = guard
            .get(&key)
            .cloned()
            .unwrap_or_else(|| guard.key_item(&key));
        item.extend(request.set);

        let keys = guard.key_item(&key);
        let old = guard.write(key, item.clone())?;
        self.record_change(&guard, keys, old, item.clone());
        trace!(table = %request.table, "update");
        Ok(item)
    }

    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        let table = self.table(&request.table)?;
        let guard = Self::read_lock(&table, request.options, "query")?;
        let page = guard.query(&request, self.page_size)?;
        trace!(
            table = %request.table,
            index = ?request.index,
            rows = page.items.len(),
            more = page.continuation.is_some(),
            "query page"
        );
        Ok(page)
    }
}
