//! Process-local fallback store.
//!
//! Serves non-persistent groups, and every group when the shared store is
//! unavailable. Never shared across processes and never persisted; entries
//! do not expire.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::value::CacheValue;

#[derive(Debug, Default)]
pub struct LocalStore {
    entries: RwLock<HashMap<String, CacheValue>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.entries.read().get(key).cloned()
    }

    /// Store a copy of `value`. Always succeeds.
    pub fn set(&self, key: &str, value: &CacheValue) -> bool {
        self.entries.write().insert(key.to_string(), value.clone());
        true
    }

    /// Store a copy of `value` only if `key` is absent.
    pub fn add(&self, key: &str, value: &CacheValue) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value.clone());
        true
    }

    /// Overwrite `key` with a copy of `value` only if it is present.
    pub fn replace(&self, key: &str, value: &CacheValue) -> bool {
        match self.entries.write().get_mut(key) {
            Some(slot) => {
                *slot = value.clone();
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Add `delta` to the entry under `key`, counting non-numeric values as 0.
    ///
    /// Returns the new value, or `None` if the key is missing.
    pub fn apply_delta(&self, key: &str, delta: i64) -> Option<i64> {
        let mut entries = self.entries.write();
        let slot = entries.get_mut(key)?;
        let updated = slot.numeric_or_zero().saturating_add(delta);
        *slot = CacheValue::Int(updated);
        Some(updated)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry, for introspection.
    pub fn snapshot(&self) -> HashMap<String, CacheValue> {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_replace() {
        let store = LocalStore::new();
        assert!(!store.replace("k", &CacheValue::Int(1)));
        assert!(!store.exists("k"));

        assert!(store.add("k", &CacheValue::Int(1)));
        assert!(!store.add("k", &CacheValue::Int(2)));
        assert_eq!(store.get("k"), Some(CacheValue::Int(1)));

        assert!(store.replace("k", &CacheValue::Int(3)));
        assert_eq!(store.get("k"), Some(CacheValue::Int(3)));
    }

    #[test]
    fn test_set_copies_value() {
        let store = LocalStore::new();
        let mut value = CacheValue::from(vec![1i64, 2]);
        store.set("k", &value);

        if let CacheValue::List(items) = &mut value {
            items.push(CacheValue::Int(3));
        }
        assert_eq!(store.get("k"), Some(CacheValue::from(vec![1i64, 2])));
    }

    #[test]
    fn test_apply_delta() {
        let store = LocalStore::new();
        assert_eq!(store.apply_delta("n", 1), None);

        store.set("n", &CacheValue::from("5"));
        assert_eq!(store.apply_delta("n", 2), Some(7));
        assert_eq!(store.apply_delta("n", -10), Some(-3));

        store.set("s", &CacheValue::from("abc"));
        assert_eq!(store.apply_delta("s", 4), Some(4));
    }

    #[test]
    fn test_delete_and_clear() {
        let store = LocalStore::new();
        store.set("a", &CacheValue::Null);
        store.set("b", &CacheValue::Null);

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }
}
