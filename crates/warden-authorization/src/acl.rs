//! Loading and mutating the grants stored on an entry
//!
//! Reads go through the entry-local cache. Writes always start from a fresh
//! directory read, mutate a private clone, write it back through
//! [`Directory::modify_attrs`] and then invalidate the permission cache for
//! the target. Grants that expire are checked against the configured share
//! lifetime before anything is written. No compare-and-swap is attempted: two concurrent writers on
//! the same entry race and the last write wins.

use crate::cache::PermissionCache;
use crate::directory::{AttrChanges, Directory};
use crate::errors::{WardenError, WardenResult};
use crate::expiry::validate_grant_expiry;
use crate::grant::Grant;
use crate::grant_set::GrantSet;
use std::sync::Arc;
use warden_core::config::GrantPolicyConfig;
use warden_core::{Entry, RightCatalog};

/// Multi-valued attribute holding serialized grants
pub const ACE_ATTR: &str = "zimbraACE";

/// Entry-local cache key of the parsed [`GrantSet`]
pub const ACL_CACHE_KEY: &str = "ENTRY.ACL_CACHE";

/// Grant storage on top of a [`Directory`]
pub struct AclStore<'a> {
    directory: &'a dyn Directory,
    catalog: &'a RightCatalog,
    permission_cache: Option<&'a dyn PermissionCache>,
    grant_policy: GrantPolicyConfig,
}

impl<'a> AclStore<'a> {
    /// Store without a permission cache to invalidate
    pub fn new(directory: &'a dyn Directory, catalog: &'a RightCatalog) -> Self {
        Self {
            directory,
            catalog,
            permission_cache: None,
            grant_policy: GrantPolicyConfig::default(),
        }
    }

    /// Invalidate `cache` after every successful write
    pub fn with_permission_cache(mut self, cache: &'a dyn PermissionCache) -> Self {
        self.permission_cache = Some(cache);
        self
    }

    /// Share lifetime limits applied by [`AclStore::grant_expiring`]
    pub fn with_grant_policy(mut self, policy: &GrantPolicyConfig) -> Self {
        self.grant_policy = policy.clone();
        self
    }

    /// Backing directory
    pub fn directory(&self) -> &'a dyn Directory {
        self.directory
    }

    /// Catalog used to parse stored grants
    pub fn catalog(&self) -> &'a RightCatalog {
        self.catalog
    }

    /// Grants stored on `entry`, or `None` when it carries none
    pub fn grant_set(&self, entry: &Entry) -> WardenResult<Option<Arc<GrantSet>>> {
        if let Some(cached) = self.directory.cached_data(entry, ACL_CACHE_KEY) {
            if let Ok(set) = cached.downcast::<GrantSet>() {
                return Ok(non_empty(set));
            }
        }
        let set = Arc::new(self.load_fresh(entry)?);
        self.directory
            .set_cached_data(entry, ACL_CACHE_KEY, set.clone());
        Ok(non_empty(set))
    }

    fn load_fresh(&self, entry: &Entry) -> WardenResult<GrantSet> {
        let aces = self.directory.multi_attr(entry, ACE_ATTR)?;
        GrantSet::parse(&aces, self.catalog, entry)
    }

    fn validate(&self, target: &Entry, grants: &[Grant]) -> WardenResult<()> {
        let target_type = target.target_type();
        for grant in grants {
            grant.validate()?;
            if !grant.right().is_grantable_on(target_type) {
                return Err(WardenError::invalid_request(format!(
                    "right {} cannot be granted on a {target_type} entry",
                    grant.right().name()
                )));
            }
        }
        Ok(())
    }

    fn write(&self, target: &Entry, set: &GrantSet) -> WardenResult<()> {
        let changes = AttrChanges::from([(ACE_ATTR.to_string(), set.serialize())]);
        self.directory.modify_attrs(target, &changes)?;
        if let Some(cache) = self.permission_cache {
            cache.invalidate(target);
        }
        Ok(())
    }

    /// Add grants to `target`, returning those actually added or changed
    pub fn grant(&self, target: &Entry, grants: &[Grant]) -> WardenResult<Vec<Grant>> {
        self.validate(target, grants)?;

        let mut set = self.load_fresh(target)?;
        let granted = set.grant(grants.iter().cloned());
        if granted.is_empty() {
            return Ok(granted);
        }
        self.write(target, &set)?;
        tracing::info!(
            target = %target.name,
            count = granted.len(),
            "granted rights"
        );
        Ok(granted)
    }

    /// Add user-right grants that lapse at `expiry`, against the wall clock
    pub fn grant_expiring(
        &self,
        target: &Entry,
        grants: &[Grant],
        expiry: Option<&str>,
    ) -> WardenResult<(Vec<Grant>, i64)> {
        self.grant_expiring_at(
            target,
            grants,
            expiry,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// Add user-right grants that lapse at `expiry`
    ///
    /// Returns the grants actually added together with the effective expiry
    /// in epoch milliseconds (`0` for never) for the caller to record with the
    /// share. Admin rights never expire. A policy conflict leaves the stored
    /// grants untouched.
    pub fn grant_expiring_at(
        &self,
        target: &Entry,
        grants: &[Grant],
        expiry: Option<&str>,
        now_ms: i64,
    ) -> WardenResult<(Vec<Grant>, i64)> {
        if let Some(admin) = grants.iter().find(|g| !g.right().is_user_right()) {
            return Err(WardenError::invalid_request(format!(
                "admin right {} cannot be granted with an expiry",
                admin.right().name()
            )));
        }
        let max_lifetime_ms = self.grant_policy.max_lifetime_ms;
        let expiry = match validate_grant_expiry(expiry, max_lifetime_ms, now_ms) {
            Ok(expiry) => expiry,
            Err(e) => {
                tracing::info!(
                    target = %target.name,
                    max_lifetime_ms,
                    error = %e,
                    "grant refused by expiry policy"
                );
                return Err(e);
            }
        };
        let granted = self.grant(target, grants)?;
        Ok((granted, expiry))
    }

    /// Remove grants from `target`, returning those actually removed
    pub fn revoke(&self, target: &Entry, grants: &[Grant]) -> WardenResult<Vec<Grant>> {
        let mut set = self.load_fresh(target)?;
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let revoked = set.revoke(grants);
        if revoked.is_empty() {
            return Ok(revoked);
        }
        self.write(target, &set)?;
        tracing::info!(
            target = %target.name,
            count = revoked.len(),
            "revoked rights"
        );
        Ok(revoked)
    }
}

fn non_empty(set: Arc<GrantSet>) -> Option<Arc<GrantSet>> {
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedPermission, MemoryPermissionCache};
    use crate::decision::Decision;
    use crate::directory::MemoryDirectory;
    use warden_core::{
        AdminFlags, EntryId, EntryKind, GranteeType, Principal, RightDefinition, TargetType,
    };

    struct Fixture {
        dir: MemoryDirectory,
        catalog: RightCatalog,
        target: Arc<Entry>,
        user: Arc<Entry>,
    }

    fn fixture() -> Fixture {
        let dir = MemoryDirectory::new();
        let target = dir.add_entry(Entry::new(
            EntryId::from_name("target"),
            "target@example.com",
            EntryKind::Account(AdminFlags::default()),
        ));
        let user = dir.add_entry(Entry::new(
            EntryId::from_name("user"),
            "user@example.com",
            EntryKind::Account(AdminFlags::default()),
        ));
        let mut builder = RightCatalog::builder();
        builder
            .define(&RightDefinition::preset("sendAs", TargetType::Account, true).cacheable())
            .unwrap();
        builder
            .define(&RightDefinition::preset("createAccount", TargetType::Domain, false))
            .unwrap();
        Fixture {
            dir,
            catalog: builder.build(),
            target,
            user,
        }
    }

    #[test]
    fn test_grant_writes_and_reloads() {
        let f = fixture();
        let store = AclStore::new(&f.dir, &f.catalog);
        assert!(store.grant_set(&f.target).unwrap().is_none());

        let right = f.catalog.lookup("sendAs").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);
        let granted = store.grant(&f.target, &[grant.clone()]).unwrap();
        assert_eq!(granted, vec![grant.clone()]);

        let set = store.grant_set(&f.target).unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            f.dir.multi_attr(&f.target, ACE_ATTR).unwrap(),
            vec![grant.serialize()]
        );

        assert!(store.grant(&f.target, &[grant]).unwrap().is_empty());
        assert_eq!(f.dir.write_count(), 1);
    }

    #[test]
    fn test_cached_set_survives_until_write() {
        let f = fixture();
        let store = AclStore::new(&f.dir, &f.catalog);
        let right = f.catalog.lookup("sendAs").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);
        store.grant(&f.target, &[grant.clone()]).unwrap();

        let before = store.grant_set(&f.target).unwrap().unwrap();
        store.revoke(&f.target, &[grant]).unwrap();
        assert_eq!(before.len(), 1);
        assert!(store.grant_set(&f.target).unwrap().is_none());
    }

    #[test]
    fn test_grant_invalidates_permission_cache() {
        let f = fixture();
        let cache = MemoryPermissionCache::new(16);
        let store = AclStore::new(&f.dir, &f.catalog).with_permission_cache(&cache);
        let right = f.catalog.lookup("sendAs").unwrap();
        let principal = Principal::Entry(f.user.clone());
        cache.put(&principal, &f.target, &right, false, Decision::Deny);

        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right.clone());
        store.grant(&f.target, &[grant]).unwrap();
        assert_eq!(
            cache.get(&principal, &f.target, &right, false),
            CachedPermission::NotCached
        );
    }

    #[test]
    fn test_expiring_grant_follows_share_policy() {
        const NOW: i64 = 1_700_000_000_000;
        const DAY: i64 = 86_400_000;
        let f = fixture();
        let policy = GrantPolicyConfig {
            max_lifetime_ms: DAY,
        };
        let store = AclStore::new(&f.dir, &f.catalog).with_grant_policy(&policy);
        let right = f.catalog.lookup("sendAs").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);

        let too_late = (NOW + 2 * DAY).to_string();
        for expiry in [Some(too_late.as_str()), Some("0")] {
            let err = store
                .grant_expiring_at(&f.target, &[grant.clone()], expiry, NOW)
                .unwrap_err();
            assert_eq!(
                err.denial_reason(),
                Some(warden_core::DenialReason::GrantExpiryPolicy)
            );
        }
        assert_eq!(f.dir.write_count(), 0);

        let (granted, expiry) = store
            .grant_expiring_at(&f.target, &[grant.clone()], None, NOW)
            .unwrap();
        assert_eq!(granted, vec![grant]);
        assert_eq!(expiry, NOW + DAY);
        assert_eq!(f.dir.write_count(), 1);
    }

    #[test]
    fn test_admin_rights_cannot_expire() {
        let f = fixture();
        let domain = f.dir.add_entry(Entry::new(
            EntryId::from_name("example.com"),
            "example.com",
            EntryKind::Domain,
        ));
        let store = AclStore::new(&f.dir, &f.catalog);
        let right = f.catalog.lookup("createAccount").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);
        assert!(matches!(
            store.grant_expiring(&domain, &[grant], None),
            Err(WardenError::InvalidRequest { .. })
        ));
        assert_eq!(f.dir.write_count(), 0);
    }

    #[test]
    fn test_revoke_without_acl_is_empty() {
        let f = fixture();
        let store = AclStore::new(&f.dir, &f.catalog);
        let right = f.catalog.lookup("sendAs").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);
        assert!(store.revoke(&f.target, &[grant]).unwrap().is_empty());
        assert_eq!(f.dir.write_count(), 0);
    }

    #[test]
    fn test_grant_rejects_wrong_target_type() {
        let f = fixture();
        let store = AclStore::new(&f.dir, &f.catalog);
        let right = f.catalog.lookup("createAccount").unwrap();
        let grant = Grant::allow(f.user.id.to_string(), GranteeType::User, right);
        assert!(matches!(
            store.grant(&f.target, &[grant]),
            Err(WardenError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_corrupt_acl_is_parse_error() {
        let f = fixture();
        f.dir
            .set_attr(f.target.id, ACE_ATTR, vec!["not an ace at all".to_string()]);
        let store = AclStore::new(&f.dir, &f.catalog);
        assert!(matches!(
            store.grant_set(&f.target),
            Err(WardenError::Parse { .. })
        ));
    }
}
