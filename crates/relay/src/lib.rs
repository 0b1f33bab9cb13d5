//! Downstream consumers of the event log
//!
//! Two collaborators that sit outside the core:
//! - Projector + CheckpointStore: replay the log into a handler and record
//!   the last processed global position per consumer
//! - ChangeRelay + QueuePublisher: republish newly committed events from a
//!   store's change feed onto named queues

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change_relay;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod message;
pub mod projector;
pub mod queue;

pub use change_relay::ChangeRelay;
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use message::EventMessage;
pub use projector::Projector;
pub use queue::{MemoryQueue, OutboundMessage, QueuePublisher};
