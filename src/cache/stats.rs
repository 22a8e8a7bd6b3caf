//! Hit/miss accounting.
//!
//! Counts are kept in atomics for cheap reads and mirrored into prometheus
//! counters for the `/metrics` endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{IntCounter, Registry};
use serde::Serialize;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hits as a fraction of all reads (0.0 - 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

pub struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    hits_metric: IntCounter,
    misses_metric: IntCounter,
    registry: Registry,
}

impl StatsCounter {
    pub fn new() -> prometheus::Result<Self> {
        let hits_metric = IntCounter::new("object_cache_hits_total", "Cache reads that found a value")?;
        let misses_metric = IntCounter::new("object_cache_misses_total", "Cache reads that found nothing")?;

        let registry = Registry::new();
        registry.register(Box::new(hits_metric.clone()))?;
        registry.register(Box::new(misses_metric.clone()))?;

        Ok(Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            hits_metric,
            misses_metric,
            registry,
        })
    }

    /// Record one read.
    pub fn record(&self, found: bool) {
        if found {
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.hits_metric.inc();
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.misses_metric.inc();
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
        }
    }

    /// Registry holding this counter's metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
