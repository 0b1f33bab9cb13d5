//! Event store engine
//!
//! This crate implements the log on top of any [`KeyRangeStore`]:
//! - SequenceAllocator: compare-and-swap counter handing out global positions
//! - AppendEngine: optimistic-concurrency writes guarded by stream version
//!   and global position
//! - RangeQueryEngine: paged forward/backward reads per stream and over the
//!   whole log, eager or lazy
//! - EventStore: the facade bundling all three
//!
//! The engine holds no locks. Mutual exclusion between writers comes only
//! from the store's conditional writes.
//!
//! [`KeyRangeStore`]: streamlog_core::KeyRangeStore

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod append;
pub mod event_store;
pub mod query;

#[cfg(test)]
mod testing;

pub use allocator::SequenceAllocator;
pub use append::AppendEngine;
pub use event_store::{EventStore, EventStoreBuilder};
pub use query::{EventPages, RangeQueryEngine};
