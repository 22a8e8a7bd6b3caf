//! Generation counters for groups and tenants.
//!
//! Counters live in the shared store when it is available, otherwise in the
//! local store, under keys built by [`KeyNamespace::version_key`]. Each
//! counter is read at most once per process and memoized; the memo only
//! changes on an explicit bump.
//!
//! Bumps are read-modify-write without compare-and-swap. Two processes
//! bumping concurrently may lose an increment, but any single bump already
//! moves the namespace past every key minted before it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::key::{KeyNamespace, VersionKind};
use crate::cache::local::LocalStore;
use crate::cache::store::{StoreAvailability, StoreError};
use crate::cache::tenant::TenantId;
use crate::cache::value::CacheValue;

pub struct VersionStore {
    namespace: KeyNamespace,
    availability: StoreAvailability,
    local: Arc<LocalStore>,
    group_versions: RwLock<HashMap<String, u64>>,
    site_versions: RwLock<HashMap<TenantId, u64>>,
}

impl VersionStore {
    pub fn new(
        namespace: KeyNamespace,
        availability: StoreAvailability,
        local: Arc<LocalStore>,
    ) -> Self {
        Self {
            namespace,
            availability,
            local,
            group_versions: RwLock::new(HashMap::new()),
            site_versions: RwLock::new(HashMap::new()),
        }
    }

    /// Current generation of `group`. A failed store read is not memoized.
    pub fn group_version(&self, group: &str) -> Result<u64, StoreError> {
        if let Some(v) = self.group_versions.read().get(group) {
            return Ok(*v);
        }
        let v = self.read_counter(VersionKind::Group, group)?;
        Ok(*self
            .group_versions
            .write()
            .entry(group.to_string())
            .or_insert(v))
    }

    /// Current generation of `tenant`. A failed store read is not memoized.
    pub fn site_version(&self, tenant: TenantId) -> Result<u64, StoreError> {
        if let Some(v) = self.site_versions.read().get(&tenant) {
            return Ok(*v);
        }
        let v = self.read_counter(VersionKind::Site, &tenant.to_string())?;
        Ok(*self.site_versions.write().entry(tenant).or_insert(v))
    }

    /// Advance the generation of `group`, returning the new value.
    ///
    /// If the store write fails the memo is still advanced, so this process
    /// sees the bump, and the write error is returned.
    pub fn bump_group_version(&self, group: &str) -> Result<u64, StoreError> {
        let next = self.group_version(group)?.saturating_add(1);
        let written = self.write_counter(VersionKind::Group, group, next);
        memoize(&self.group_versions, group.to_string(), next);
        debug!(group, version = next, persisted = written.is_ok(), "Bumped group version");
        written.map(|()| next)
    }

    /// Advance the generation of `tenant`, returning the new value.
    ///
    /// Same failure behavior as [`VersionStore::bump_group_version`].
    pub fn bump_site_version(&self, tenant: TenantId) -> Result<u64, StoreError> {
        let next = self.site_version(tenant)?.saturating_add(1);
        let written = self.write_counter(VersionKind::Site, &tenant.to_string(), next);
        memoize(&self.site_versions, tenant, next);
        debug!(tenant, version = next, persisted = written.is_ok(), "Bumped site version");
        written.map(|()| next)
    }

    /// Memoized group generations.
    pub fn group_versions(&self) -> HashMap<String, u64> {
        self.group_versions.read().clone()
    }

    /// Memoized tenant generations.
    pub fn site_versions(&self) -> HashMap<TenantId, u64> {
        self.site_versions.read().clone()
    }

    /// Read a counter from its tier. Missing, negative or non-numeric reads as 0.
    fn read_counter(&self, kind: VersionKind, name: &str) -> Result<u64, StoreError> {
        let key = self.namespace.version_key(kind, name);
        let value = match self.availability.store() {
            Some(store) => store.fetch(&key).inspect_err(|e| {
                warn!(key = %key, error = %e, "Version read failed");
            })?,
            None => self.local.get(&key),
        };

        Ok(value
            .map(|v| v.numeric_or_zero())
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0))
    }

    fn write_counter(&self, kind: VersionKind, name: &str, version: u64) -> Result<(), StoreError> {
        let key = self.namespace.version_key(kind, name);
        let value = CacheValue::from(version);
        match self.availability.store() {
            Some(store) => {
                store.store(&key, &value, 0).inspect_err(|e| {
                    warn!(key = %key, error = %e, "Version write failed, bump is process-local");
                })?;
            }
            None => {
                self.local.set(&key, &value);
            }
        }
        Ok(())
    }
}

fn memoize<K: Eq + Hash>(memo: &RwLock<HashMap<K, u64>>, key: K, version: u64) {
    memo.write().insert(key, version);
}
