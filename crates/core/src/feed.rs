//! Change feed records
//!
//! A store that offers a change feed reports each committed write as a
//! [`ChangeRecord`], in commit order per table. The relay consumes these to
//! republish newly committed events.

use crate::attribute::Item;
use serde::{Deserialize, Serialize};

/// What kind of write produced a change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A new item was written
    Insert,
    /// An existing item was overwritten or updated
    Modify,
    /// An item was removed
    Remove,
}

/// One committed write as seen by the change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Feed sequence number (monotonic per store)
    pub sequence: u64,
    /// Table the write landed in
    pub table: String,
    /// Kind of write
    pub kind: ChangeKind,
    /// Primary key attributes of the written item
    pub keys: Item,
    /// Item before the write, if it existed
    pub old_image: Option<Item>,
    /// Item after the write, unless removed
    pub new_image: Option<Item>,
}
