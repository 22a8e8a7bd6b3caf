//! Generation-versioned object cache.
//!
//! This module contains the core cache data structures and algorithms:
//! - [`value`]: CacheValue, the dynamically typed stored value
//! - [`store`]: SharedStore trait and StoreAvailability
//! - [`memory_store`]: In-memory SharedStore implementation
//! - [`codec`]: JSON + zstd payload encoding for the shared store
//! - [`local`]: Process-local fallback store
//! - [`tenant`]: TenantContext and group classification
//! - [`version`]: Group and tenant generation counters
//! - [`key`]: Composed key construction
//! - [`tier`]: Shared vs. local routing
//! - [`stats`]: Hit/miss accounting
//! - [`facade`]: The public cache API

pub mod codec;
pub mod facade;
pub mod key;
pub mod local;
pub mod memory_store;
pub mod stats;
pub mod store;
pub mod tenant;
pub mod tier;
pub mod value;
pub mod version;
