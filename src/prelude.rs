//! Convenient imports for Streamlog.
//!
//! ```ignore
//! use streamlog::prelude::*;
//!
//! let events = streamlog::in_memory(EventStoreConfig::default())?;
//! events.append("order-42", 1, "OrderPlaced", b"{}".to_vec())?;
//! ```

// Main entry point
pub use streamlog_engine::{EventStore, EventStoreBuilder};

// Error handling
pub use streamlog_core::{Error, Result};

// Events and read bounds
pub use streamlog_core::{Event, ReadCount, ReadFrom};

// Configuration
pub use streamlog_core::{EventStoreConfig, RetryConfig};

// Storage
pub use streamlog_core::KeyRangeStore;
pub use streamlog_storage::MemoryStore;

// Consumers
pub use streamlog_relay::{ChangeRelay, CheckpointStore, MemoryCheckpointStore, Projector};
