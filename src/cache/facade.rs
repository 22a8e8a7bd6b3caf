//! The cache facade: public operations over both tiers.
//!
//! Every operation composes a versioned key, picks a tier, and runs there.
//! Expected conditions (missing key, existing key on `add`, store transport
//! failures) come back as `false` / `None`; nothing here panics or returns
//! an error for them. A generation that cannot be read fails the operation
//! instead of falling back to generation 0.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::key::{ComposedKey, KeyComposer, KeyNamespace};
use crate::cache::local::LocalStore;
use crate::cache::stats::{CacheStats, StatsCounter};
use crate::cache::store::{SharedStore, StoreAvailability, StoreError};
use crate::cache::tenant::{normalize_group, TenantContext, TenantId, GLOBAL_TENANT};
use crate::cache::tier::{Tier, TierSelector};
use crate::cache::value::CacheValue;
use crate::cache::version::VersionStore;
use crate::config::Config;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Result of [`CacheFacade::get_multi`]: group -> key -> value, found keys only.
pub type MultiGetResult = BTreeMap<String, BTreeMap<String, CacheValue>>;

/// The tier an operation resolved to, with the store to run it against.
enum Target<'a> {
    Shared(&'a dyn SharedStore),
    Local(&'a LocalStore),
}

pub struct CacheFacade {
    composer: KeyComposer,
    versions: VersionStore,
    selector: TierSelector,
    availability: StoreAvailability,
    local: Arc<LocalStore>,
    tenant: RwLock<TenantContext>,
    stats: StatsCounter,
    additions_suspended: AtomicBool,
}

impl CacheFacade {
    /// Build a facade. `availability` is final for the facade's lifetime.
    pub fn new(
        namespace: KeyNamespace,
        tenant: TenantContext,
        availability: StoreAvailability,
    ) -> Result<Self, SetupError> {
        let local = Arc::new(LocalStore::new());
        let versions = VersionStore::new(namespace.clone(), availability.clone(), local.clone());

        info!(
            salt = namespace.salt(),
            fingerprint = namespace.fingerprint(),
            shared_store = availability.is_available(),
            multi_tenant = tenant.is_multi_tenant(),
            tenant = tenant.tenant_id(),
            "Object cache initialized"
        );

        Ok(Self {
            composer: KeyComposer::new(namespace),
            versions,
            selector: TierSelector::new(availability.is_available()),
            availability,
            local,
            tenant: RwLock::new(tenant),
            stats: StatsCounter::new()?,
            additions_suspended: AtomicBool::new(false),
        })
    }

    /// Build a facade from configuration and an optional shared store.
    pub fn from_config(
        config: &Config,
        store: Option<Arc<dyn SharedStore>>,
    ) -> Result<Self, SetupError> {
        let namespace = KeyNamespace::new(config.cache.salt.clone(), &config.cache.install_path);
        let availability = StoreAvailability::resolve(store, config.store.enabled);
        Self::new(namespace, TenantContext::from_config(&config.cache), availability)
    }

    // ─── Routing ───────────────────────────────────────────────────────────

    /// Compose the key for (`raw_key`, `group`) under the active tenant.
    pub fn compose_key(&self, raw_key: &str, group: &str) -> Result<ComposedKey, StoreError> {
        let ctx = self.tenant.read();
        self.composer.compose(&ctx, &self.versions, raw_key, group)
    }

    /// Tier that operations on `group` currently run against.
    pub fn tier_for(&self, group: &str) -> Tier {
        self.selector.select(&self.tenant.read(), group)
    }

    /// Compose the key and pick its tier. `None` when a generation could not
    /// be read; the caller returns its failure value.
    fn route(&self, raw_key: &str, group: &str) -> Option<(ComposedKey, Tier)> {
        let ctx = self.tenant.read();
        match self.composer.compose(&ctx, &self.versions, raw_key, group) {
            Ok(key) => Some((key, self.selector.select(&ctx, group))),
            Err(e) => {
                warn!(key = raw_key, group, error = %e, "Key composition failed");
                None
            }
        }
    }

    fn target(&self, tier: Tier) -> Target<'_> {
        match (tier, self.availability.store()) {
            (Tier::Shared, Some(store)) => Target::Shared(store.as_ref()),
            _ => Target::Local(&self.local),
        }
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    /// Fetch a copy of the value under (`key`, `group`). `None` means not found.
    pub fn get(&self, key: &str, group: &str) -> Option<CacheValue> {
        let Some((key, tier)) = self.route(key, group) else {
            self.stats.record(false);
            return None;
        };
        let value = match self.target(tier) {
            Target::Shared(store) => store
                .fetch(key.as_str())
                .unwrap_or_else(|e| failed("fetch", &key, e, None)),
            Target::Local(local) => local.get(key.as_str()),
        };

        self.stats.record(value.is_some());
        value
    }

    /// Fetch many keys across groups. Keys that are not found are omitted;
    /// every requested group appears in the result.
    pub fn get_multi<I, G, K>(&self, groups: I) -> MultiGetResult
    where
        I: IntoIterator<Item = (G, K)>,
        G: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut result = MultiGetResult::new();
        for (group, keys) in groups {
            let group = group.as_ref();
            let found = result.entry(group.to_string()).or_default();
            for key in keys {
                let key = key.as_ref();
                if let Some(value) = self.get(key, group) {
                    found.insert(key.to_string(), value);
                }
            }
        }
        result
    }

    // ─── Writes ────────────────────────────────────────────────────────────

    /// Unconditionally store a copy of `value`. A `ttl` of 0 or less never expires.
    pub fn set(&self, key: &str, value: &CacheValue, group: &str, ttl: i64) -> bool {
        let Some((key, tier)) = self.route(key, group) else {
            return false;
        };
        match self.target(tier) {
            Target::Shared(store) => store
                .store(key.as_str(), value, clamp_ttl(ttl))
                .unwrap_or_else(|e| failed("store", &key, e, false)),
            Target::Local(local) => local.set(key.as_str(), value),
        }
    }

    /// Store only if the key does not exist yet in its tier.
    pub fn add(&self, key: &str, value: &CacheValue, group: &str, ttl: i64) -> bool {
        if self.additions_suspended() {
            debug!(key, group, "Additions suspended, add skipped");
            return false;
        }

        let Some((key, tier)) = self.route(key, group) else {
            return false;
        };
        match self.target(tier) {
            Target::Shared(store) => {
                let run = || -> Result<bool, StoreError> {
                    if store.exists(key.as_str())? {
                        return Ok(false);
                    }
                    store.store(key.as_str(), value, clamp_ttl(ttl))
                };
                run().unwrap_or_else(|e| failed("add", &key, e, false))
            }
            Target::Local(local) => local.add(key.as_str(), value),
        }
    }

    /// Store only if the key already exists in its tier.
    pub fn replace(&self, key: &str, value: &CacheValue, group: &str, ttl: i64) -> bool {
        let Some((key, tier)) = self.route(key, group) else {
            return false;
        };
        match self.target(tier) {
            Target::Shared(store) => {
                let run = || -> Result<bool, StoreError> {
                    if !store.exists(key.as_str())? {
                        return Ok(false);
                    }
                    store.store(key.as_str(), value, clamp_ttl(ttl))
                };
                run().unwrap_or_else(|e| failed("replace", &key, e, false))
            }
            Target::Local(local) => local.replace(key.as_str(), value),
        }
    }

    /// Remove the entry; returns whether it was present.
    pub fn delete(&self, key: &str, group: &str) -> bool {
        let Some((key, tier)) = self.route(key, group) else {
            return false;
        };
        match self.target(tier) {
            Target::Shared(store) => store
                .delete(key.as_str())
                .unwrap_or_else(|e| failed("delete", &key, e, false)),
            Target::Local(local) => local.delete(key.as_str()),
        }
    }

    /// Increment an existing numeric entry. Negative offsets count as 0.
    ///
    /// Returns the new value, or `None` if the key does not exist.
    pub fn incr(&self, key: &str, offset: i64, group: &str) -> Option<i64> {
        self.apply_offset(key, offset.max(0), group, Direction::Up)
    }

    /// Decrement an existing numeric entry. Negative offsets count as 0.
    ///
    /// Returns the new value, or `None` if the key does not exist.
    pub fn decr(&self, key: &str, offset: i64, group: &str) -> Option<i64> {
        self.apply_offset(key, offset.max(0), group, Direction::Down)
    }

    fn apply_offset(&self, key: &str, offset: i64, group: &str, direction: Direction) -> Option<i64> {
        let (key, tier) = self.route(key, group)?;
        match self.target(tier) {
            Target::Shared(store) => {
                let run = || -> Result<Option<i64>, StoreError> {
                    if !store.exists(key.as_str())? {
                        return Ok(None);
                    }
                    match direction {
                        Direction::Up => store.increment(key.as_str(), offset),
                        Direction::Down => store.decrement(key.as_str(), offset),
                    }
                };
                run().unwrap_or_else(|e| failed("counter", &key, e, None))
            }
            Target::Local(local) => {
                let delta = match direction {
                    Direction::Up => offset,
                    Direction::Down => -offset,
                };
                local.apply_delta(key.as_str(), delta)
            }
        }
    }

    // ─── Invalidation ──────────────────────────────────────────────────────

    /// Wipe both tiers outright. The only invalidation that deletes data.
    pub fn flush(&self) -> bool {
        self.local.clear();
        let ok = match self.availability.store() {
            Some(store) => match store.clear() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Shared store clear failed");
                    false
                }
            },
            None => true,
        };
        info!(shared_cleared = ok, "Cache flushed");
        ok
    }

    /// Bump the generation of each named group. Returns false for an empty
    /// list, or when any bump could not be persisted to its tier.
    pub fn flush_groups<I>(&self, groups: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut flushed = 0usize;
        let mut unpersisted = 0usize;
        for group in groups {
            if self.versions.bump_group_version(normalize_group(group.as_ref())).is_err() {
                unpersisted += 1;
            }
            flushed += 1;
        }

        if flushed == 0 {
            return false;
        }
        info!(groups = flushed, unpersisted, "Flushed groups");
        unpersisted == 0
    }

    /// Bump the generation of each named tenant, or of the active tenant when
    /// none are named. The global namespace (tenant 0) is always bumped too.
    /// Returns false when any bump could not be persisted to its tier.
    pub fn flush_sites<I>(&self, tenants: I) -> bool
    where
        I: IntoIterator<Item = TenantId>,
    {
        let mut sites: BTreeSet<TenantId> = tenants.into_iter().collect();
        if sites.is_empty() {
            sites.insert(self.tenant_prefix());
        }
        sites.insert(GLOBAL_TENANT);

        let mut unpersisted = 0usize;
        for &site in &sites {
            if self.versions.bump_site_version(site).is_err() {
                unpersisted += 1;
            }
        }
        info!(sites = ?sites, unpersisted, "Flushed sites");
        unpersisted == 0
    }

    // ─── Tenant and group configuration ────────────────────────────────────

    /// Make `tenant_id` the active tenant. Ignored unless multi-tenant.
    pub fn switch_tenant(&self, tenant_id: TenantId) {
        let mut ctx = self.tenant.write();
        ctx.switch_tenant(tenant_id);
        debug!(requested = tenant_id, active = ctx.tenant_id(), "Switched tenant");
    }

    pub fn register_global_groups<I>(&self, groups: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.tenant.write().register_global_groups(groups);
    }

    pub fn register_non_persistent_groups<I>(&self, groups: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.tenant.write().register_non_persistent_groups(groups);
    }

    /// While suspended, `add` fails without touching either tier.
    pub fn suspend_additions(&self, suspend: bool) {
        self.additions_suspended.store(suspend, Ordering::Relaxed);
    }

    pub fn additions_suspended(&self) -> bool {
        self.additions_suspended.load(Ordering::Relaxed)
    }

    /// Nothing to release; always succeeds.
    pub fn close(&self) -> bool {
        true
    }

    // ─── Introspection ─────────────────────────────────────────────────────

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn metrics_registry(&self) -> &prometheus::Registry {
        self.stats.registry()
    }

    /// The active tenant id.
    pub fn tenant_prefix(&self) -> TenantId {
        self.tenant.read().tenant_id()
    }

    pub fn is_multi_tenant(&self) -> bool {
        self.tenant.read().is_multi_tenant()
    }

    pub fn is_shared_available(&self) -> bool {
        self.availability.is_available()
    }

    pub fn salt(&self) -> &str {
        self.composer.namespace().salt()
    }

    pub fn fingerprint(&self) -> &str {
        self.composer.namespace().fingerprint()
    }

    pub fn global_groups(&self) -> BTreeSet<String> {
        self.tenant.read().global_groups().clone()
    }

    pub fn non_persistent_groups(&self) -> BTreeSet<String> {
        self.tenant.read().non_persistent_groups().clone()
    }

    pub fn group_versions(&self) -> HashMap<String, u64> {
        self.versions.group_versions()
    }

    pub fn site_versions(&self) -> HashMap<TenantId, u64> {
        self.versions.site_versions()
    }

    /// Number of entries in the process-local tier.
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// Copy of the process-local tier.
    pub fn local_snapshot(&self) -> HashMap<String, CacheValue> {
        self.local.snapshot()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

fn clamp_ttl(ttl: i64) -> u64 {
    u64::try_from(ttl).unwrap_or(0)
}

/// Log a store failure and fold it into the operation's failure value.
fn failed<T>(op: &str, key: &ComposedKey, error: StoreError, fallback: T) -> T {
    warn!(op, key = %key, error = %error, "Shared store operation failed");
    fallback
}
