//! Storage capability interface
//!
//! The event store needs four things from a backing store:
//! - point writes guarded by existence conditions ([`KeyRangeStore::put`])
//! - point reads that observe the caller's own prior writes ([`KeyRangeStore::get`])
//! - conditional in-place updates for compare-and-swap ([`KeyRangeStore::update`])
//! - paged, ordered range queries over the table or a secondary index, with
//!   opaque continuation tokens ([`KeyRangeStore::query`])
//!
//! Any ordered key-range store that can express these can back the log.
//!
//! ## Key Model
//!
//! A table has a partition key and an optional numeric sort key. Secondary
//! indexes have their own partition key and numeric sort key and are sparse:
//! only items carrying both index attributes appear in the index.

use crate::attribute::{AttributeValue, Item};
use crate::error::StoreError;
use std::sync::Arc;
use std::time::Duration;

/// Key layout of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Partition key attribute
    pub partition_key: String,
    /// Numeric sort key attribute, if the table has one
    pub sort_key: Option<String>,
    /// Secondary indexes
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Table keyed by partition key only
    pub fn new(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// Add a numeric sort key
    pub fn sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Add a sparse secondary index
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Look up an index by name
    pub fn find_index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Key layout of a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name
    pub name: String,
    /// Partition key attribute
    pub partition_key: String,
    /// Numeric sort key attribute
    pub sort_key: String,
}

impl IndexSchema {
    /// Create an index schema
    pub fn new(
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Give up if the round trip cannot complete within this duration
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options with a timeout
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

/// A guard evaluated atomically with a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// No item exists under the request's primary key
    ItemNotExists,
    /// The item under the primary key lacks this attribute (or does not exist)
    AttributeNotExists(String),
    /// The item under the primary key exists and has this attribute value
    AttributeEquals(String, AttributeValue),
    /// No item is indexed under this key in the named index
    IndexKeyNotExists {
        /// Index name
        index: String,
        /// Index partition key value
        partition: AttributeValue,
        /// Index sort key value
        sort: i64,
    },
}

/// Write a whole item
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Target table
    pub table: String,
    /// Item, including its primary key attributes
    pub item: Item,
    /// Guards that must all hold
    pub conditions: Vec<Condition>,
    /// Request options
    pub options: RequestOptions,
}

impl PutRequest {
    /// Unconditional put
    pub fn new(table: impl Into<String>, item: Item) -> Self {
        Self {
            table: table.into(),
            item,
            conditions: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    /// Add a guard
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set request options
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Read one item by primary key
#[derive(Debug, Clone)]
pub struct GetRequest {
    /// Target table
    pub table: String,
    /// Primary key attributes
    pub key: Item,
    /// Must observe all previously acknowledged writes
    pub consistent_read: bool,
    /// Request options
    pub options: RequestOptions,
}

impl GetRequest {
    /// Consistent point read
    pub fn new(table: impl Into<String>, key: Item) -> Self {
        Self {
            table: table.into(),
            key,
            consistent_read: true,
            options: RequestOptions::default(),
        }
    }

    /// Set request options
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Assign attributes on one item, creating it if absent
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Target table
    pub table: String,
    /// Primary key attributes
    pub key: Item,
    /// Attributes to assign
    pub set: Item,
    /// Guards that must all hold
    pub conditions: Vec<Condition>,
    /// Request options
    pub options: RequestOptions,
}

impl UpdateRequest {
    /// Unconditional update
    pub fn new(table: impl Into<String>, key: Item) -> Self {
        Self {
            table: table.into(),
            key,
            set: Item::new(),
            conditions: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    /// Assign an attribute
    pub fn set(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.set.insert(name.into(), value);
        self
    }

    /// Add a guard
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set request options
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending sort key
    Forward,
    /// Descending sort key
    Backward,
}

/// Inclusive bound on the sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortBound {
    /// `sort >= n`
    AtLeast(i64),
    /// `sort <= n`
    AtMost(i64),
}

impl SortBound {
    /// Whether a sort key value satisfies this bound
    pub fn contains(&self, sort: i64) -> bool {
        match self {
            SortBound::AtLeast(n) => sort >= *n,
            SortBound::AtMost(n) => sort <= *n,
        }
    }
}

/// Opaque cursor for resuming a query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a store-encoded cursor
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The encoded cursor
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Read one page of an ordered range
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Target table
    pub table: String,
    /// Query a secondary index instead of the table
    pub index: Option<String>,
    /// Partition key value to match
    pub partition: AttributeValue,
    /// Inclusive sort key bound
    pub sort_bound: Option<SortBound>,
    /// Scan order
    pub direction: Direction,
    /// Maximum rows in this page
    pub limit: Option<usize>,
    /// Must observe all previously acknowledged writes
    pub consistent_read: bool,
    /// Resume after the row this token points at
    pub start_after: Option<ContinuationToken>,
    /// Request options
    pub options: RequestOptions,
}

impl QueryRequest {
    /// Forward, unbounded, consistent query on a partition
    pub fn new(table: impl Into<String>, partition: AttributeValue) -> Self {
        Self {
            table: table.into(),
            index: None,
            partition,
            sort_bound: None,
            direction: Direction::Forward,
            limit: None,
            consistent_read: true,
            start_after: None,
            options: RequestOptions::default(),
        }
    }

    /// Query a secondary index
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set an inclusive sort key bound
    pub fn bound(mut self, bound: Option<SortBound>) -> Self {
        self.sort_bound = bound;
        self
    }

    /// Set scan order
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Cap the page size
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Resume from a previous page
    pub fn start_after(mut self, token: Option<ContinuationToken>) -> Self {
        self.start_after = token;
        self
    }

    /// Set request options
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Rows in scan order
    pub items: Vec<Item>,
    /// Present when more rows may remain
    pub continuation: Option<ContinuationToken>,
}

/// Capability interface of an ordered key-range store
///
/// Implementations must be safe to call from many threads at once. Mutual
/// exclusion between writers is expressed only through [`Condition`]s; the
/// event store itself holds no locks.
pub trait KeyRangeStore: Send + Sync {
    /// Write a whole item if every condition holds
    ///
    /// On the first failing condition returns
    /// [`StoreError::ConditionFailed`] and writes nothing.
    fn put(&self, request: PutRequest) -> Result<(), StoreError>;

    /// Read one item by primary key
    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError>;

    /// Assign attributes on one item if every condition holds
    ///
    /// Returns the item as it is after the update.
    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError>;

    /// Read one page of an ordered range
    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError>;
}

impl<S: KeyRangeStore + ?Sized> KeyRangeStore for Arc<S> {
    fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        (**self).put(request)
    }

    fn get(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        (**self).get(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<Item, StoreError> {
        (**self).update(request)
    }

    fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        (**self).query(request)
    }
}
