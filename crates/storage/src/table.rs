//! In-memory table with sparse secondary indexes
//!
//! # Layout
//!
//! - Rows: partition key -> BTreeMap<sort key, Item>
//! - Each index: index partition key -> BTreeMap<index sort key, PrimaryKey>
//!
//! Tables without a sort key store their single row per partition under
//! sort key 0. Index entries are unique per index key: a write that would
//! put a second row under an occupied index key is rejected instead of
//! shadowing the first.

use crate::token::Cursor;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use streamlog_core::{
    AttributeValue, Condition, Direction, IndexSchema, Item, QueryPage, QueryRequest, SortBound,
    StoreError, TableSchema,
};

/// Primary key of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PrimaryKey {
    pub partition: AttributeValue,
    pub sort: i64,
}

#[derive(Debug)]
struct SecondaryIndex {
    schema: IndexSchema,
    entries: FxHashMap<AttributeValue, BTreeMap<i64, PrimaryKey>>,
}

impl SecondaryIndex {
    fn new(schema: IndexSchema) -> Self {
        Self {
            schema,
            entries: FxHashMap::default(),
        }
    }

    fn lookup(&self, partition: &AttributeValue, sort: i64) -> Option<&PrimaryKey> {
        self.entries.get(partition).and_then(|p| p.get(&sort))
    }

    fn insert(&mut self, partition: AttributeValue, sort: i64, key: PrimaryKey) {
        self.entries.entry(partition).or_default().insert(sort, key);
    }

    fn remove(&mut self, partition: &AttributeValue, sort: i64) {
        if let Some(p) = self.entries.get_mut(partition) {
            p.remove(&sort);
            if p.is_empty() {
                self.entries.remove(partition);
            }
        }
    }
}

/// Index key of an item, if it carries both index attributes
fn index_key(schema: &IndexSchema, item: &Item) -> Option<(AttributeValue, i64)> {
    let partition = item.get(&schema.partition_key).filter(|v| !v.is_null())?;
    let sort = item.get(&schema.sort_key)?.as_number()?;
    Some((partition.clone(), sort))
}

/// One table's rows and indexes
#[derive(Debug)]
pub(crate) struct Table {
    schema: TableSchema,
    partitions: FxHashMap<AttributeValue, BTreeMap<i64, Item>>,
    indexes: FxHashMap<String, SecondaryIndex>,
    len: usize,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|i| (i.name.clone(), SecondaryIndex::new(i.clone())))
            .collect();
        Self {
            schema,
            partitions: FxHashMap::default(),
            indexes,
            len: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Extract and validate the primary key of an item or key map
    pub fn primary_key(&self, item: &Item) -> Result<PrimaryKey, StoreError> {
        let partition = match item.get(&self.schema.partition_key) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                return Err(StoreError::InvalidRequest(format!(
                    "missing partition key '{}'",
                    self.schema.partition_key
                )))
            }
        };
        let sort = match &self.schema.sort_key {
            None => 0,
            Some(name) => match item.get(name) {
                Some(AttributeValue::N(n)) => *n,
                Some(other) => {
                    return Err(StoreError::InvalidRequest(format!(
                        "sort key '{}' must be N, found {}",
                        name,
                        other.type_name()
                    )))
                }
                None => {
                    return Err(StoreError::InvalidRequest(format!(
                        "missing sort key '{}'",
                        name
                    )))
                }
            },
        };
        Ok(PrimaryKey { partition, sort })
    }

    /// Key attributes only, as reported on the change feed
    pub fn key_item(&self, key: &PrimaryKey) -> Item {
        let mut item = Item::new();
        item.insert(self.schema.partition_key.clone(), key.partition.clone());
        if let Some(sort_key) = &self.schema.sort_key {
            item.insert(sort_key.clone(), AttributeValue::N(key.sort));
        }
        item
    }

    pub fn get(&self, key: &PrimaryKey) -> Option<&Item> {
        self.partitions.get(&key.partition).and_then(|p| p.get(&key.sort))
    }

    /// Evaluate guards against the current state
    ///
    /// Returns the index of the first condition that does not hold.
    pub fn check(&self, key: &PrimaryKey, conditions: &[Condition]) -> Result<(), StoreError> {
        let current = self.get(key);
        for (condition_index, condition) in conditions.iter().enumerate() {
            let holds = match condition {
                Condition::ItemNotExists => current.is_none(),
                Condition::AttributeNotExists(name) => {
                    current.map_or(true, |item| !item.contains_key(name))
                }
                Condition::AttributeEquals(name, value) => {
                    current.and_then(|item| item.get(name)) == Some(value)
                }
                Condition::IndexKeyNotExists {
                    index,
                    partition,
                    sort,
                } => {
                    let idx = self
                        .indexes
                        .get(index)
                        .ok_or_else(|| StoreError::UnknownIndex(index.clone()))?;
                    idx.lookup(partition, *sort).is_none()
                }
            };
            if !holds {
                return Err(StoreError::ConditionFailed { condition_index });
            }
        }
        Ok(())
    }

    /// Write a row, maintaining every index
    ///
    /// Returns the row it replaced. Nothing changes if an index key is
    /// already owned by another row.
    pub fn write(&mut self, key: PrimaryKey, item: Item) -> Result<Option<Item>, StoreError> {
        let mut new_entries = Vec::with_capacity(self.indexes.len());
        for (name, idx) in &self.indexes {
            if let Some((partition, sort)) = index_key(&idx.schema, &item) {
                if let Some(owner) = idx.lookup(&partition, sort) {
                    if *owner != key {
                        return Err(StoreError::InvalidRequest(format!(
                            "index '{}' already has an entry at {}/{}",
                            name, partition, sort
                        )));
                    }
                }
                new_entries.push((name.clone(), partition, sort));
            }
        }

        let old = self
            .partitions
            .entry(key.partition.clone())
            .or_default()
            .insert(key.sort, item);

        match &old {
            Some(old_item) => {
                for idx in self.indexes.values_mut() {
                    if let Some((partition, sort)) = index_key(&idx.schema, old_item) {
                        idx.remove(&partition, sort);
                    }
                }
            }
            None => self.len += 1,
        }
        for (name, partition, sort) in new_entries {
            if let Some(idx) = self.indexes.get_mut(&name) {
                idx.insert(partition, sort, key.clone());
            }
        }
        Ok(old)
    }

    /// Read one page of an ordered range
    ///
    /// A page holds at most `min(limit, page_size)` rows. The continuation
    /// token is set only when at least one more row matched.
    pub fn query(&self, request: &QueryRequest, page_size: usize) -> Result<QueryPage, StoreError> {
        let cap = request.limit.map_or(page_size, |l| l.min(page_size));

        let index = match &request.index {
            Some(name) => Some(
                self.indexes
                    .get(name)
                    .ok_or_else(|| StoreError::UnknownIndex(name.clone()))?,
            ),
            None => None,
        };
        let after = match &request.start_after {
            Some(token) => Some(
                Cursor::decode_for(token, &self.schema.name, request.index.as_deref())?.last_sort,
            ),
            None => None,
        };

        let range = match sort_range(request.sort_bound, after, request.direction) {
            Some(range) if cap > 0 => range,
            _ => return Ok(QueryPage::default()),
        };

        let mut rows: Vec<(i64, Item)> = match index {
            None => match self.partitions.get(&request.partition) {
                Some(partition) => scan(partition, range, request.direction)
                    .take(cap + 1)
                    .map(|(sort, item)| (*sort, item.clone()))
                    .collect(),
                None => Vec::new(),
            },
            Some(idx) => match idx.entries.get(&request.partition) {
                Some(entries) => scan(entries, range, request.direction)
                    .filter_map(|(sort, key)| self.get(key).map(|item| (*sort, item.clone())))
                    .take(cap + 1)
                    .collect(),
                None => Vec::new(),
            },
        };

        let has_more = rows.len() > cap;
        rows.truncate(cap);

        let continuation = match (has_more, rows.last()) {
            (true, Some((last_sort, _))) => Some(
                Cursor {
                    table: self.schema.name.clone(),
                    index: request.index.clone(),
                    last_sort: *last_sort,
                }
                .encode()?,
            ),
            _ => None,
        };

        Ok(QueryPage {
            items: rows.into_iter().map(|(_, item)| item).collect(),
            continuation,
        })
    }
}

/// Inclusive sort key range for a query, or `None` if nothing can match
fn sort_range(
    bound: Option<SortBound>,
    after: Option<i64>,
    direction: Direction,
) -> Option<RangeInclusive<i64>> {
    let (mut lo, mut hi) = (i64::MIN, i64::MAX);
    match bound {
        Some(SortBound::AtLeast(n)) => lo = n,
        Some(SortBound::AtMost(n)) => hi = n,
        None => {}
    }
    if let Some(last) = after {
        match direction {
            Direction::Forward => lo = lo.max(last.checked_add(1)?),
            Direction::Backward => hi = hi.min(last.checked_sub(1)?),
        }
    }
    (lo <= hi).then_some(lo..=hi)
}

fn scan<'a, V>(
    map: &'a BTreeMap<i64, V>,
    range: RangeInclusive<i64>,
    direction: Direction,
) -> Box<dyn Iterator<Item = (&'a i64, &'a V)> + 'a> {
    match direction {
        Direction::Forward => Box::new(map.range(range)),
        Direction::Backward => Box::new(map.range(range).rev()),
    }
}
