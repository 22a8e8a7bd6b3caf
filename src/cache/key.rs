//! Key composition.
//!
//! A composed key embeds the generation pair that minted it:
//!
//! ```text
//! {salt}:{fingerprint}:{tenant_prefix}:{group}:{raw_key}:v{site_version}.{group_version}
//! ```
//!
//! Bumping either generation moves every later key for that (tenant, group)
//! into a namespace disjoint from all earlier ones. Old entries are never
//! deleted; they become unreachable and are left to the store's own eviction.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::cache::store::StoreError;
use crate::cache::tenant::{normalize_group, TenantContext, TenantId};
use crate::cache::version::VersionStore;

/// Which generation counter a version key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionKind {
    Group,
    Site,
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionKind::Group => write!(f, "GroupVersion"),
            VersionKind::Site => write!(f, "SiteVersion"),
        }
    }
}

/// Hash an installation path into a fixed-width fingerprint.
///
/// First 16 bytes of SHA-256, hex encoded (32 characters).
pub fn install_fingerprint(install_path: &str) -> String {
    let digest = Sha256::digest(install_path.as_bytes());
    hex::encode(&digest[..16])
}

/// The `{salt}:{fingerprint}` namespace shared by entry and version keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    salt: String,
    fingerprint: String,
}

impl KeyNamespace {
    pub fn new(salt: impl Into<String>, install_path: &str) -> Self {
        Self {
            salt: salt.into(),
            fingerprint: install_fingerprint(install_path),
        }
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `{salt}:{fingerprint}:{GroupVersion|SiteVersion}:{name}`
    pub fn version_key(&self, kind: VersionKind, name: &str) -> String {
        format!("{}:{}:{}:{}", self.salt, self.fingerprint, kind, name)
    }
}

/// A fully qualified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposedKey {
    key: String,
    prefix: TenantId,
    site_version: u64,
    group_version: u64,
}

impl ComposedKey {
    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn prefix(&self) -> TenantId {
        self.prefix
    }

    /// The (site, group) generation pair embedded in the key.
    pub fn generations(&self) -> (u64, u64) {
        (self.site_version, self.group_version)
    }
}

impl fmt::Display for ComposedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Builds composed keys from tenant state and current generations.
#[derive(Debug, Clone)]
pub struct KeyComposer {
    namespace: KeyNamespace,
}

impl KeyComposer {
    pub fn new(namespace: KeyNamespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Fails when a generation cannot be read. Composing with a guessed
    /// generation could land in a namespace that was already flushed.
    pub fn compose(
        &self,
        ctx: &TenantContext,
        versions: &VersionStore,
        raw_key: &str,
        group: &str,
    ) -> Result<ComposedKey, StoreError> {
        let group = normalize_group(group);
        let prefix = ctx.prefix_for(group);
        let group_version = versions.group_version(group)?;
        let site_version = versions.site_version(prefix)?;

        Ok(ComposedKey {
            key: format!(
                "{}:{}:{}:{}:{}:v{}.{}",
                self.namespace.salt,
                self.namespace.fingerprint,
                prefix,
                group,
                raw_key,
                site_version,
                group_version
            ),
            prefix,
            site_version,
            group_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::local::LocalStore;
    use crate::cache::store::StoreAvailability;

    fn fixture() -> (KeyComposer, VersionStore) {
        let namespace = KeyNamespace::new("oc", "/srv/app");
        let versions = VersionStore::new(
            namespace.clone(),
            StoreAvailability::Unavailable,
            Arc::new(LocalStore::new()),
        );
        (KeyComposer::new(namespace), versions)
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = install_fingerprint("/srv/app");
        assert_eq!(a.len(), 32);
        assert_eq!(a, install_fingerprint("/srv/app"));
        assert_ne!(a, install_fingerprint("/srv/other"));
    }

    #[test]
    fn test_composed_key_format() {
        let (composer, versions) = fixture();
        let ctx = TenantContext::new(true, 5);
        let fp = composer.namespace().fingerprint().to_string();

        let key = composer.compose(&ctx, &versions, "post-12", "posts").unwrap();
        assert_eq!(key.as_str(), format!("oc:{fp}:5:posts:post-12:v0.0"));
        assert_eq!(key.generations(), (0, 0));
    }

    #[test]
    fn test_empty_group_and_global_prefix() {
        let (composer, versions) = fixture();
        let mut ctx = TenantContext::new(true, 5);
        ctx.register_global_groups(["users"]);
        let fp = composer.namespace().fingerprint().to_string();

        let key = composer.compose(&ctx, &versions, "k", "").unwrap();
        assert_eq!(key.as_str(), format!("oc:{fp}:5:default:k:v0.0"));

        let key = composer.compose(&ctx, &versions, "k", "users").unwrap();
        assert_eq!(key.prefix(), 0);
        assert_eq!(key.as_str(), format!("oc:{fp}:0:users:k:v0.0"));
    }

    #[test]
    fn test_bump_changes_key() {
        let (composer, versions) = fixture();
        let ctx = TenantContext::new(true, 2);

        let before = composer.compose(&ctx, &versions, "k", "posts").unwrap();
        assert_eq!(before, composer.compose(&ctx, &versions, "k", "posts").unwrap());

        versions.bump_group_version("posts").unwrap();
        let after_group = composer.compose(&ctx, &versions, "k", "posts").unwrap();
        assert_ne!(before, after_group);
        assert_eq!(after_group.generations(), (0, 1));

        versions.bump_site_version(2).unwrap();
        let after_site = composer.compose(&ctx, &versions, "k", "posts").unwrap();
        assert_ne!(after_group, after_site);
        assert_eq!(after_site.generations(), (1, 1));
    }

    #[test]
    fn test_version_key_format() {
        let namespace = KeyNamespace::new("oc", "/srv/app");
        let fp = namespace.fingerprint().to_string();
        assert_eq!(
            namespace.version_key(VersionKind::Group, "posts"),
            format!("oc:{fp}:GroupVersion:posts")
        );
        assert_eq!(
            namespace.version_key(VersionKind::Site, "0"),
            format!("oc:{fp}:SiteVersion:0")
        );
    }
}
