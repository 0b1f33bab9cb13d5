//! Storage layer for streamlog
//!
//! This crate implements an in-memory ordered key-range store with:
//! - MemoryStore: per-table BTreeMap partitions behind a RwLock
//! - Sparse unique secondary indexes (the event position index)
//! - Conditional put/update evaluated atomically with the write
//! - Paged range queries with opaque continuation tokens
//! - A change feed of committed writes
//! - An availability switch for exercising outage handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
mod table;
mod token;

pub use memory::{MemoryStore, DEFAULT_PAGE_SIZE};
