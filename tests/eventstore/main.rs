//! Event Store Integration Tests
//!
//! Append, read and concurrency behaviour of the full stack over MemoryStore.

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod properties;
mod reads;
