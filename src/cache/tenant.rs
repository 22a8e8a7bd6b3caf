//! Tenant context: which tenant is active and how groups are classified.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::CacheConfig;

/// Identifies a tenant (site) within a multi-tenant deployment.
pub type TenantId = u64;

/// Namespace shared by all global groups.
pub const GLOBAL_TENANT: TenantId = 0;

/// Tenant used when the deployment is not multi-tenant.
pub const DEFAULT_TENANT: TenantId = 1;

/// Group used when a caller passes an empty group name.
pub const DEFAULT_GROUP: &str = "default";

/// Normalize an empty group name to [`DEFAULT_GROUP`].
pub fn normalize_group(group: &str) -> &str {
    if group.is_empty() {
        DEFAULT_GROUP
    } else {
        group
    }
}

/// Per-process tenant state.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    tenant_id: TenantId,
    multi_tenant: bool,
    global_groups: BTreeSet<String>,
    non_persistent_groups: BTreeSet<String>,
}

impl TenantContext {
    pub fn new(multi_tenant: bool, tenant_id: TenantId) -> Self {
        Self {
            tenant_id: if multi_tenant { tenant_id } else { DEFAULT_TENANT },
            multi_tenant,
            global_groups: BTreeSet::new(),
            non_persistent_groups: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut ctx = Self::new(config.multi_tenant, config.tenant_id);
        ctx.register_global_groups(&config.global_groups);
        ctx.register_non_persistent_groups(&config.non_persistent_groups);
        ctx
    }

    /// Make `tenant_id` the active tenant. Ignored unless multi-tenant.
    pub fn switch_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = if self.multi_tenant {
            tenant_id
        } else {
            DEFAULT_TENANT
        };
    }

    pub fn register_global_groups<I>(&mut self, groups: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.global_groups
            .extend(groups.into_iter().map(|g| g.as_ref().to_string()));
    }

    pub fn register_non_persistent_groups<I>(&mut self, groups: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.non_persistent_groups
            .extend(groups.into_iter().map(|g| g.as_ref().to_string()));
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn is_multi_tenant(&self) -> bool {
        self.multi_tenant
    }

    pub fn is_global_group(&self, group: &str) -> bool {
        self.global_groups.contains(group)
    }

    pub fn is_non_persistent_group(&self, group: &str) -> bool {
        self.non_persistent_groups.contains(group)
    }

    /// Key prefix for `group`: the global namespace or the active tenant.
    pub fn prefix_for(&self, group: &str) -> TenantId {
        if self.is_global_group(group) {
            GLOBAL_TENANT
        } else {
            self.tenant_id
        }
    }

    pub fn global_groups(&self) -> &BTreeSet<String> {
        &self.global_groups
    }

    pub fn non_persistent_groups(&self) -> &BTreeSet<String> {
        &self.non_persistent_groups
    }
}

impl Default for TenantContext {
    fn default() -> Self {
        Self::new(false, DEFAULT_TENANT)
    }
}
