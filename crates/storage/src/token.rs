//! Continuation token encoding
//!
//! A token records the last row a page returned, scoped to the table and
//! index it came from. Callers see only base64 text; a token replayed
//! against a different table or index is rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use streamlog_core::{ContinuationToken, StoreError};

/// Decoded form of a continuation token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Cursor {
    /// Table the query ran against
    pub table: String,
    /// Index the query ran against, if any
    pub index: Option<String>,
    /// Sort key of the last returned row
    pub last_sort: i64,
}

impl Cursor {
    pub fn encode(&self) -> Result<ContinuationToken, StoreError> {
        let json = serde_json::to_vec(self).map_err(|e| StoreError::InvalidToken(e.to_string()))?;
        Ok(ContinuationToken::new(URL_SAFE_NO_PAD.encode(json)))
    }

    pub fn decode(token: &ContinuationToken) -> Result<Self, StoreError> {
        let json = URL_SAFE_NO_PAD
            .decode(token.as_str())
            .map_err(|e| StoreError::InvalidToken(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| StoreError::InvalidToken(e.to_string()))
    }

    /// Decode and check the token belongs to this table/index
    pub fn decode_for(
        token: &ContinuationToken,
        table: &str,
        index: Option<&str>,
    ) -> Result<Self, StoreError> {
        let cursor = Self::decode(token)?;
        if cursor.table != table || cursor.index.as_deref() != index {
            return Err(StoreError::InvalidToken(format!(
                "token for {}/{:?} used on {}/{:?}",
                cursor.table, cursor.index, table, index
            )));
        }
        Ok(cursor)
    }
}
