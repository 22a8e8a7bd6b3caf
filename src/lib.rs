//! object-cache-tier: generation-versioned, multi-tenant object cache.
//!
//! Sits in front of a fast shared key-value store and makes invalidation of
//! a whole group or a whole tenant an O(1) counter bump: every composed key
//! embeds the current group and tenant generations, so bumping one moves all
//! later reads to a fresh namespace. A process-local tier takes over when the
//! shared store is unavailable or a group is marked non-persistent.
//!
//! Exposes a JSON HTTP API for use as a standalone service.

pub mod cache;
pub mod config;
pub mod server;

pub use cache::facade::{CacheFacade, MultiGetResult, SetupError};
pub use cache::memory_store::MemoryStore;
pub use cache::stats::CacheStats;
pub use cache::store::{SharedStore, StoreAvailability, StoreError};
pub use cache::tenant::{TenantContext, TenantId, DEFAULT_GROUP, GLOBAL_TENANT};
pub use cache::tier::Tier;
pub use cache::value::CacheValue;
pub use config::Config;
