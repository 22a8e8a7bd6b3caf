//! Cached value type.
//!
//! Values are stored verbatim and copied at every store boundary: a
//! `CacheValue` handed to the cache is cloned on write, and reads hand back
//! an owned clone, so caller state and cached state never alias.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically typed cache value.
///
/// Serialized untagged, so the JSON form of a value is the value itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// Numeric reading of the value, if it has one.
    ///
    /// Integers, floats (truncated toward zero), booleans and strings that
    /// parse as numbers are numeric. Everything else returns `None`.
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            CacheValue::Int(v) => Some(*v),
            CacheValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            CacheValue::Bool(b) => Some(i64::from(*b)),
            CacheValue::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            }
            _ => None,
        }
    }

    /// Numeric reading with non-numeric values counted as zero.
    pub fn numeric_or_zero(&self) -> i64 {
        self.as_numeric().unwrap_or(0)
    }
}

impl Default for CacheValue {
    fn default() -> Self {
        CacheValue::Null
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Null => write!(f, "null"),
            CacheValue::Bool(b) => write!(f, "{b}"),
            CacheValue::Int(v) => write!(f, "{v}"),
            CacheValue::Float(v) => write!(f, "{v}"),
            CacheValue::Str(s) => write!(f, "{s}"),
            CacheValue::List(items) => write!(f, "list[{}]", items.len()),
            CacheValue::Map(entries) => write!(f, "map[{}]", entries.len()),
        }
    }
}

impl From<i64> for CacheValue {
    fn from(v: i64) -> Self {
        CacheValue::Int(v)
    }
}

impl From<u64> for CacheValue {
    fn from(v: u64) -> Self {
        CacheValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<i32> for CacheValue {
    fn from(v: i32) -> Self {
        CacheValue::Int(i64::from(v))
    }
}

impl From<f64> for CacheValue {
    fn from(v: f64) -> Self {
        CacheValue::Float(v)
    }
}

impl From<bool> for CacheValue {
    fn from(v: bool) -> Self {
        CacheValue::Bool(v)
    }
}

impl From<&str> for CacheValue {
    fn from(v: &str) -> Self {
        CacheValue::Str(v.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(v: String) -> Self {
        CacheValue::Str(v)
    }
}

impl<T: Into<CacheValue>> From<Vec<T>> for CacheValue {
    fn from(items: Vec<T>) -> Self {
        CacheValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(entries: BTreeMap<String, CacheValue>) -> Self {
        CacheValue::Map(entries)
    }
}
