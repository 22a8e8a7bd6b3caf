//! In-memory shared store.
//!
//! Plays the role of a shared-memory segment for a single process: values
//! are held encoded (see [`Codec`]), so every write and read is a deep copy.
//! Expired entries read as absent and are dropped lazily on access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::codec::Codec;
use crate::cache::store::{SharedStore, StoreError};
use crate::cache::value::CacheValue;
use crate::config::StoreConfig;

#[derive(Debug)]
struct StoredEntry {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A thread-safe in-memory [`SharedStore`].
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    codec: Codec,
    enabled: bool,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            codec: Codec::new(config),
            enabled: config.enabled,
        }
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `delta` to a numeric entry under the write lock.
    fn apply_delta(&self, key: &str, delta: i64) -> Result<Option<i64>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            entries.remove(key);
            return Ok(None);
        }

        let current = self.codec.decode(&entry.payload)?.numeric_or_zero();
        let updated = current.saturating_add(delta);
        entry.payload = self.codec.encode(&CacheValue::Int(updated))?;

        Ok(Some(updated))
    }
}

impl SharedStore for MemoryStore {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheValue>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some(self.codec.decode(&entry.payload)?));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
            debug!(key, "Dropped expired entry");
        }
        Ok(None)
    }

    fn store(&self, key: &str, value: &CacheValue, ttl_secs: u64) -> Result<bool, StoreError> {
        let payload = self.codec.encode(value)?;
        // A TTL too large for the clock never expires.
        let expires_at = if ttl_secs > 0 {
            Instant::now().checked_add(Duration::from_secs(ttl_secs))
        } else {
            None
        };

        self.entries
            .write()
            .insert(key.to_string(), StoredEntry { payload, expires_at });
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|e| !e.is_expired(now)))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| !e.is_expired(now)))
    }

    fn increment(&self, key: &str, offset: i64) -> Result<Option<i64>, StoreError> {
        self.apply_delta(key, offset)
    }

    fn decrement(&self, key: &str, offset: i64) -> Result<Option<i64>, StoreError> {
        self.apply_delta(key, offset.saturating_neg())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}
