//! Benchmarks for the cache facade.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use object_cache_tier::cache::codec::Codec;
use object_cache_tier::cache::key::KeyNamespace;
use object_cache_tier::config::StoreConfig;
use object_cache_tier::{
    CacheFacade, CacheValue, MemoryStore, SharedStore, StoreAvailability, TenantContext,
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

fn bench_compose_key(c: &mut Criterion) {
    let cache = shared_cache();
    // Warm the version memo.
    cache.compose_key("k", "posts").unwrap();

    c.bench_function("compose_key_memoized", |b| {
        b.iter(|| black_box(cache.compose_key(black_box("post-12345"), "posts").unwrap()))
    });
}

fn bench_get_hit(c: &mut Criterion) {
    let cache = shared_cache();
    for i in 0..10_000 {
        cache.set(&format!("k{i}"), &CacheValue::Int(i), "posts", 0);
    }

    c.bench_function("shared_get_hit_10k", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i = (i + 1) % 10_000;
            black_box(cache.get(&format!("k{i}"), "posts"));
        })
    });
}

fn bench_flush_group(c: &mut Criterion) {
    let cache = shared_cache();
    for i in 0..10_000 {
        cache.set(&format!("k{i}"), &CacheValue::Int(i), "posts", 0);
    }

    c.bench_function("flush_group_with_10k_entries", |b| {
        b.iter(|| black_box(cache.flush_groups(["posts"])))
    });
}

fn bench_codec(c: &mut Criterion) {
    let codec = Codec::new(&StoreConfig::default());

    // 64KB string value, compressed on encode.
    let value = CacheValue::from("x".repeat(64 * 1024));

    c.bench_function("codec_encode_64kb", |b| {
        b.iter(|| black_box(codec.encode(black_box(&value))))
    });
}

criterion_group!(
    benches,
    bench_compose_key,
    bench_get_hit,
    bench_flush_group,
    bench_codec,
);
criterion_main!(benches);
