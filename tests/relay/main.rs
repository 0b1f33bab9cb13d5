//! Relay Integration Tests
//!
//! Projector and change relay driven by a live event store.

#[path = "../common/mod.rs"]
mod common;

mod change_feed;
mod projection;
