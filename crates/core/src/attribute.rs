//! Store-native attribute values
//!
//! A backing store sees every record as an [`Item`]: a map from attribute
//! name to [`AttributeValue`]. The variant set is deliberately small, the
//! common denominator of ordered key-range stores.
//!
//! ## Equality Rules
//!
//! - Different variants are NEVER equal (no coercion)
//! - `N(1)` != `S("1")`
//! - `S("abc")` != `B([97, 98, 99])`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute as the store holds it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    /// UTF-8 string
    S(String),
    /// 64-bit signed number
    N(i64),
    /// Binary blob, distinct from `S`
    B(Vec<u8>),
    /// Boolean
    Bool(bool),
    /// Explicit null
    Null,
}

/// One stored record
pub type Item = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "Bool",
            AttributeValue::Null => "Null",
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::N(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as bytes slice
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::B(b) => Some(b),
            _ => None,
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::S(s) => write!(f, "{:?}", s),
            AttributeValue::N(n) => write!(f, "{}", n),
            AttributeValue::B(b) => write!(f, "<{} bytes>", b.len()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::N(n)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        AttributeValue::B(b)
    }
}
