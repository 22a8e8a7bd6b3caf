//! Tier selection: shared store or process-local fallback.

use serde::{Deserialize, Serialize};

use crate::cache::tenant::{normalize_group, TenantContext};

/// Where an operation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// The cross-process shared store.
    Shared,
    /// The process-local fallback.
    Local,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Shared => write!(f, "shared"),
            Tier::Local => write!(f, "local"),
        }
    }
}

/// Routes each operation to a tier.
///
/// Shared-store availability is fixed at construction; group membership is
/// looked up on every call so runtime registrations apply immediately.
#[derive(Debug, Clone, Copy)]
pub struct TierSelector {
    shared_available: bool,
}

impl TierSelector {
    pub fn new(shared_available: bool) -> Self {
        Self { shared_available }
    }

    pub fn is_local_only(&self, ctx: &TenantContext, group: &str) -> bool {
        !self.shared_available || ctx.is_non_persistent_group(normalize_group(group))
    }

    pub fn select(&self, ctx: &TenantContext, group: &str) -> Tier {
        if self.is_local_only(ctx, group) {
            Tier::Local
        } else {
            Tier::Shared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_routes_local() {
        let selector = TierSelector::new(false);
        let ctx = TenantContext::default();
        assert_eq!(selector.select(&ctx, "posts"), Tier::Local);
    }

    #[test]
    fn test_non_persistent_group_routes_local() {
        let selector = TierSelector::new(true);
        let mut ctx = TenantContext::default();
        assert_eq!(selector.select(&ctx, "counts"), Tier::Shared);

        ctx.register_non_persistent_groups(["counts"]);
        assert_eq!(selector.select(&ctx, "counts"), Tier::Local);
        assert_eq!(selector.select(&ctx, "posts"), Tier::Shared);
    }

    #[test]
    fn test_empty_group_uses_default() {
        let selector = TierSelector::new(true);
        let mut ctx = TenantContext::default();
        ctx.register_non_persistent_groups(["default"]);
        assert!(selector.is_local_only(&ctx, ""));
    }
}
