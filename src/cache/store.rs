//! Shared backing store abstraction.
//!
//! The shared store is the cross-process tier (a shared-memory segment, a
//! memcached-style server, ...). This crate never implements eviction or
//! persistence for it; it only decides which key to use and when to use it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::codec::CodecError;
use crate::cache::value::CacheValue;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Shared store transport failure: {0}")]
    Transport(String),

    #[error("Value encoding failed: {0}")]
    Codec(#[from] CodecError),
}

/// Operations the facade needs from a shared key-value store.
///
/// `increment`/`decrement` must be atomic for concurrent callers and `store`
/// atomic for a single key. `Ok(None)` from the counters means the key was
/// missing; non-numeric stored values count as zero.
pub trait SharedStore: Send + Sync {
    /// Whether the store is usable at all. Probed once, at facade construction.
    fn is_enabled(&self) -> bool {
        true
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheValue>, StoreError>;

    /// Upsert `value`. A `ttl_secs` of 0 means no expiry.
    fn store(&self, key: &str, value: &CacheValue, ttl_secs: u64) -> Result<bool, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    fn increment(&self, key: &str, offset: i64) -> Result<Option<i64>, StoreError>;

    fn decrement(&self, key: &str, offset: i64) -> Result<Option<i64>, StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

/// Availability of the shared store, resolved once for the process lifetime.
///
/// `Unavailable` permanently routes every operation to the local tier.
#[derive(Clone)]
pub enum StoreAvailability {
    Available(Arc<dyn SharedStore>),
    Unavailable,
}

impl StoreAvailability {
    /// Resolve availability from an optional store and the configured switch.
    pub fn resolve(store: Option<Arc<dyn SharedStore>>, enabled: bool) -> Self {
        match store {
            Some(store) if enabled && store.is_enabled() => StoreAvailability::Available(store),
            _ => StoreAvailability::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, StoreAvailability::Available(_))
    }

    /// The shared store, when available.
    pub fn store(&self) -> Option<&Arc<dyn SharedStore>> {
        match self {
            StoreAvailability::Available(store) => Some(store),
            StoreAvailability::Unavailable => None,
        }
    }
}

impl fmt::Debug for StoreAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreAvailability::Available(_) => write!(f, "Available"),
            StoreAvailability::Unavailable => write!(f, "Unavailable"),
        }
    }
}
