//! Checkpoint persistence
//!
//! A checkpoint is the last global position a named consumer has durably
//! processed. Saving is an idempotent upsert keyed by name.

use crate::error::{RelayError, Result};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Last processed position of a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Consumer name
    pub name: String,
    /// Last processed global position
    pub position: u64,
    /// When it was saved (milliseconds since epoch)
    pub timestamp: i64,
}

/// Where consumers keep their checkpoints
pub trait CheckpointStore: Send + Sync {
    /// Insert or overwrite the checkpoint for `name`
    fn save_checkpoint(&self, name: &str, position: u64, timestamp: i64) -> Result<()>;

    /// Latest checkpoint for `name`
    fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>>;
}

impl<C: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<C> {
    fn save_checkpoint(&self, name: &str, position: u64, timestamp: i64) -> Result<()> {
        (**self).save_checkpoint(name, position, timestamp)
    }

    fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>> {
        (**self).load_checkpoint(name)
    }
}

/// In-process checkpoint store
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: RwLock<FxHashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save_checkpoint(&self, name: &str, position: u64, timestamp: i64) -> Result<()> {
        self.checkpoints.write().insert(
            name.to_string(),
            Checkpoint {
                name: name.to_string(),
                position,
                timestamp,
            },
        );
        Ok(())
    }

    fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.read().get(name).cloned())
    }
}

/// Checkpoints in one JSON file
///
/// Every save rewrites the whole file through a temp file and a rename, so
/// a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCheckpointStore {
    /// Use the file at `path`, which need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Checkpoint>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)
                .map_err(|e| RelayError::Checkpoint(format!("{}: {}", self.path.display(), e)))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save_checkpoint(&self, name: &str, position: u64, timestamp: i64) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut all = self.read_all()?;
        all.insert(
            name.to_string(),
            Checkpoint {
                name: name.to_string(),
                position,
                timestamp,
            },
        );

        let tmp = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(&all)?;
        fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;

        debug!(name, position, path = %self.path.display(), "saved checkpoint");
        Ok(())
    }

    fn load_checkpoint(&self, name: &str) -> Result<Option<Checkpoint>> {
        Ok(self.read_all()?.remove(name))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> RelayError {
    RelayError::Checkpoint(format!("{}: {}", path.display(), e))
}
