//! Integration tests for the cache facade.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use object_cache_tier::cache::key::KeyNamespace;
use object_cache_tier::config::StoreConfig;
use object_cache_tier::{
    CacheFacade, CacheStats, CacheValue, MemoryStore, SharedStore, StoreAvailability, StoreError,
    TenantContext, Tier,
};

fn shared_cache() -> CacheFacade {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new(&StoreConfig::default()));
    CacheFacade::new(
        KeyNamespace::new("oc", "/srv/app"),
        TenantContext::new(true, 1),
        StoreAvailability::Available(store),
    )
    .unwrap()
}

fn local_cache() -> CacheFacade {
    CacheFacade::new(
        KeyNamespace::new("oc", "/srv/app"),
        TenantContext::new(true, 1),
        StoreAvailability::Unavailable,
    )
    .unwrap()
}

/// A store whose transport is always down.
struct BrokenStore;

impl SharedStore for BrokenStore {
    fn fetch(&self, _key: &str) -> Result<Option<CacheValue>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn store(&self, _key: &str, _value: &CacheValue, _ttl: u64) -> Result<bool, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn increment(&self, _key: &str, _offset: i64) -> Result<Option<i64>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn decrement(&self, _key: &str, _offset: i64) -> Result<Option<i64>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
    fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }
}

#[test]
fn test_set_then_get_on_both_tiers() {
    for cache in [shared_cache(), local_cache()] {
        let value = CacheValue::from(vec!["a", "b"]);
        assert!(cache.set("post-1", &value, "posts", 0));
        assert_eq!(cache.get("post-1", "posts"), Some(value));
    }
}

#[test]
fn test_get_counts_hits_and_misses() {
    let cache = shared_cache();
    cache.set("k", &CacheValue::Int(1), "posts", 0);

    cache.get("k", "posts");
    cache.get("k", "posts");
    cache.get("missing", "posts");

    assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
}

#[test]
fn test_add_does_not_overwrite() {
    for cache in [shared_cache(), local_cache()] {
        assert!(cache.add("k", &CacheValue::from("first"), "posts", 0));
        assert!(!cache.add("k", &CacheValue::from("second"), "posts", 0));
        assert_eq!(cache.get("k", "posts"), Some(CacheValue::from("first")));
    }
}

#[test]
fn test_replace_requires_existing() {
    for cache in [shared_cache(), local_cache()] {
        assert!(!cache.replace("k", &CacheValue::from("v"), "posts", 0));
        assert_eq!(cache.get("k", "posts"), None);

        cache.set("k", &CacheValue::from("v"), "posts", 0);
        assert!(cache.replace("k", &CacheValue::from("w"), "posts", 0));
        assert_eq!(cache.get("k", "posts"), Some(CacheValue::from("w")));
    }
}

#[test]
fn test_delete_reports_presence() {
    for cache in [shared_cache(), local_cache()] {
        cache.set("k", &CacheValue::Int(1), "posts", 0);
        assert!(cache.delete("k", "posts"));
        assert!(!cache.delete("k", "posts"));
        assert_eq!(cache.get("k", "posts"), None);
    }
}

#[test]
fn test_incr_decr() {
    for cache in [shared_cache(), local_cache()] {
        assert_eq!(cache.incr("n", 1, "counts"), None);
        assert_eq!(cache.decr("n", 1, "counts"), None);

        cache.set("n", &CacheValue::Int(10), "counts", 0);
        assert_eq!(cache.incr("n", 5, "counts"), Some(15));
        assert_eq!(cache.decr("n", 3, "counts"), Some(12));
        assert_eq!(cache.get("n", "counts"), Some(CacheValue::Int(12)));
    }
}

#[test]
fn test_negative_offset_is_clamped() {
    for cache in [shared_cache(), local_cache()] {
        cache.set("n", &CacheValue::Int(7), "counts", 0);
        assert_eq!(cache.incr("n", -5, "counts"), Some(7));
        assert_eq!(cache.decr("n", -5, "counts"), Some(7));
    }
}

#[test]
fn test_non_numeric_counts_as_zero() {
    for cache in [shared_cache(), local_cache()] {
        cache.set("n", &CacheValue::from("hello"), "counts", 0);
        assert_eq!(cache.incr("n", 3, "counts"), Some(3));
    }
}

#[test]
fn test_get_multi_omits_missing() {
    let cache = shared_cache();
    cache.set("k0", &CacheValue::from("g0-k0"), "g0", 0);
    cache.set("k0", &CacheValue::from("g1-k0"), "g1", 0);

    let mut request = BTreeMap::new();
    request.insert("g0", vec!["k0", "k1"]);
    request.insert("g1", vec!["k0"]);
    request.insert("g2", vec!["k9"]);

    let result = cache.get_multi(request);
    assert_eq!(result["g0"].len(), 1);
    assert_eq!(result["g0"]["k0"], CacheValue::from("g0-k0"));
    assert!(!result["g0"].contains_key("k1"));
    assert_eq!(result["g1"]["k0"], CacheValue::from("g1-k0"));
    assert!(result["g2"].is_empty());

    assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 2 });
}

#[test]
fn test_non_persistent_group_stays_local() {
    let cache = shared_cache();
    cache.register_non_persistent_groups(["counts"]);
    assert_eq!(cache.tier_for("counts"), Tier::Local);
    assert_eq!(cache.tier_for("posts"), Tier::Shared);

    cache.set("n", &CacheValue::Int(1), "counts", 0);
    assert_eq!(cache.local_len(), 1);
    assert_eq!(cache.get("n", "counts"), Some(CacheValue::Int(1)));
}

#[test]
fn test_unavailable_store_routes_everything_local() {
    let cache = local_cache();
    assert!(!cache.is_shared_available());

    cache.set("k", &CacheValue::Int(1), "posts", 0);
    assert_eq!(cache.tier_for("posts"), Tier::Local);
    assert_eq!(cache.local_len(), 1);
}

#[test]
fn test_disabled_store_resolves_unavailable() {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new(&StoreConfig {
        enabled: false,
        ..Default::default()
    }));
    let availability = StoreAvailability::resolve(Some(store), true);
    assert!(!availability.is_available());
    assert!(!StoreAvailability::resolve(None, true).is_available());
}

#[test]
fn test_transport_failures_become_failure_values() {
    let cache = CacheFacade::new(
        KeyNamespace::new("oc", "/srv/app"),
        TenantContext::default(),
        StoreAvailability::Available(Arc::new(BrokenStore)),
    )
    .unwrap();

    assert!(!cache.set("k", &CacheValue::Int(1), "posts", 0));
    assert!(!cache.add("k", &CacheValue::Int(1), "posts", 0));
    assert!(!cache.replace("k", &CacheValue::Int(1), "posts", 0));
    assert!(!cache.delete("k", "posts"));
    assert_eq!(cache.get("k", "posts"), None);
    assert_eq!(cache.incr("k", 1, "posts"), None);
    assert!(!cache.flush());
    assert!(!cache.flush_groups(["posts"]));
    assert!(!cache.flush_sites([1]));
    assert!(cache.compose_key("k", "posts").is_err());
    assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
}

#[test]
fn test_ttl_expires_through_facade() {
    let cache = shared_cache();
    assert!(cache.set("short", &CacheValue::Int(1), "posts", 1));
    assert!(cache.set("forever", &CacheValue::Int(2), "posts", 0));
    assert_eq!(cache.get("short", "posts"), Some(CacheValue::Int(1)));

    std::thread::sleep(Duration::from_millis(1100));
    assert_eq!(cache.get("short", "posts"), None);
    assert_eq!(cache.get("forever", "posts"), Some(CacheValue::Int(2)));
    assert!(cache.add("short", &CacheValue::Int(3), "posts", 0));
}

#[test]
fn test_huge_ttl_is_accepted() {
    let cache = shared_cache();
    assert!(cache.set("k", &CacheValue::Int(1), "posts", i64::MAX));
    assert!(cache.replace("k", &CacheValue::Int(2), "posts", i64::MAX));
    assert_eq!(cache.get("k", "posts"), Some(CacheValue::Int(2)));
}

#[test]
fn test_concurrent_incr_counts_every_call() {
    let cache = Arc::new(shared_cache());
    cache.set("hits", &CacheValue::Int(0), "counts", 0);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert!(cache.incr("hits", 1, "counts").is_some());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(cache.get("hits", "counts"), Some(CacheValue::Int(800)));
}

#[test]
fn test_values_are_copied() {
    let cache = local_cache();
    let mut value = CacheValue::from(vec![1i64]);
    cache.set("k", &value, "posts", 0);

    if let CacheValue::List(items) = &mut value {
        items.push(CacheValue::Int(2));
    }
    let mut read = cache.get("k", "posts").unwrap();
    assert_eq!(read, CacheValue::from(vec![1i64]));

    if let CacheValue::List(items) = &mut read {
        items.clear();
    }
    assert_eq!(cache.get("k", "posts"), Some(CacheValue::from(vec![1i64])));
}

#[test]
fn test_flush_wipes_both_tiers() {
    let cache = shared_cache();
    cache.register_non_persistent_groups(["counts"]);
    cache.set("k", &CacheValue::Int(1), "posts", 0);
    cache.set("n", &CacheValue::Int(1), "counts", 0);

    assert!(cache.flush());
    assert_eq!(cache.get("k", "posts"), None);
    assert_eq!(cache.get("n", "counts"), None);
    assert_eq!(cache.local_len(), 0);
}

#[test]
fn test_empty_group_is_default() {
    let cache = shared_cache();
    cache.set("k", &CacheValue::Int(1), "", 0);
    assert_eq!(cache.get("k", "default"), Some(CacheValue::Int(1)));
}
