//! Core types for streamlog
//!
//! This crate defines everything the other layers agree on:
//! - [`Event`]: the immutable record appended to a stream
//! - [`AttributeValue`] and [`Item`]: the store-native field representation
//! - [`codec`]: the Event Record Codec between the two
//! - [`KeyRangeStore`]: the capability interface a backing store must provide
//! - [`Error`]: the error taxonomy surfaced to callers
//! - [`ChangeRecord`]: one committed write as reported by a change feed
//! - [`EventStoreConfig`]: table names, retry budget and timeouts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod store;

pub use attribute::{AttributeValue, Item};
pub use config::{EventStoreConfig, RetryConfig};
pub use error::{Error, Result, StoreError};
pub use event::{now_millis, Event, ReadCount, ReadFrom, COUNT_ALL, POSITION_END, POSITION_START};
pub use feed::{ChangeKind, ChangeRecord};
pub use store::{
    Condition, ContinuationToken, Direction, GetRequest, IndexSchema, KeyRangeStore, PutRequest,
    QueryPage, QueryRequest, RequestOptions, SortBound, TableSchema, UpdateRequest,
};
