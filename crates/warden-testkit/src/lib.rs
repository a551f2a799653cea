//! Warden Testing Infrastructure
//!
//! Common setup for tests across the Warden crates: the standard right
//! catalog, a [`World`] builder over [`MemoryDirectory`], and proptest
//! strategies.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! warden-testkit = { path = "../warden-testkit" }
//! ```
//!
//! ```rust
//! use warden_testkit::World;
//!
//! let world = World::new();
//! let alice = world.account("alice@example.com");
//! let bob = world.account("bob@example.com");
//! world.grant_ace(&bob, &format!("{} usr sendAs", alice.id));
//! assert_eq!(world.acl(&bob).len(), 1);
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod strategies;

use std::sync::Arc;
use warden_authorization::{
    AclStore, Directory, Grant, GrantSet, MemoryDirectory, RightChecker,
};
use warden_core::{
    AdminFlags, CheckerConfig, Entry, EntryId, EntryKind, Principal, Right, RightCatalog,
};

// Re-export commonly used items
pub use warden_authorization::{Decision, Evaluation};
pub use warden_core::{GranteeType, TargetType};

/// Right definitions shared by the test suites
pub const RIGHTS_TOML: &str = include_str!("../fixtures/rights.toml");

/// The catalog built from [`RIGHTS_TOML`]
pub fn standard_catalog() -> Arc<RightCatalog> {
    Arc::new(RightCatalog::from_toml_str(RIGHTS_TOML).expect("fixture catalog must build"))
}

/// An in-memory directory plus catalog, with helpers to populate it
///
/// Entry ids are derived from names, so the same name always maps to the
/// same id across worlds.
pub struct World {
    /// Backing directory
    pub directory: Arc<MemoryDirectory>,
    /// Right catalog
    pub catalog: Arc<RightCatalog>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Empty directory over the standard catalog
    pub fn new() -> Self {
        Self::with_catalog(standard_catalog())
    }

    /// Empty directory over `catalog`
    pub fn with_catalog(catalog: Arc<RightCatalog>) -> Self {
        Self {
            directory: Arc::new(MemoryDirectory::new()),
            catalog,
        }
    }

    /// Checker without a permission cache
    pub fn checker(&self) -> RightChecker {
        RightChecker::new(self.directory.clone(), self.catalog.clone())
    }

    /// Checker built from `config`
    pub fn checker_with_config(&self, config: &CheckerConfig) -> RightChecker {
        RightChecker::from_config(self.directory.clone(), self.catalog.clone(), config)
    }

    /// Grant storage without permission cache invalidation
    pub fn acl_store(&self) -> AclStore<'_> {
        AclStore::new(&*self.directory, &self.catalog)
    }

    /// Catalog lookup
    pub fn right(&self, name: &str) -> Arc<Right> {
        self.catalog.lookup(name).unwrap()
    }

    /// Domain by name, created on first use
    pub fn domain(&self, name: &str) -> Arc<Entry> {
        if let Some(domain) = self.directory.domain_by_name(name).unwrap() {
            return domain;
        }
        self.directory
            .add_entry(Entry::new(EntryId::from_name(name), name, EntryKind::Domain))
    }

    fn domained(&self, email: &str, kind: EntryKind) -> Arc<Entry> {
        let (_, domain) = email
            .split_once('@')
            .expect("domained entry names are email addresses");
        let domain = self.domain(domain);
        self.directory
            .add_entry(Entry::new(EntryId::from_name(email), email, kind).in_domain(domain.id))
    }

    /// Plain account; its domain is created on first use
    pub fn account(&self, email: &str) -> Arc<Entry> {
        self.domained(email, EntryKind::Account(AdminFlags::default()))
    }

    /// Delegated admin account
    pub fn delegated_admin(&self, email: &str) -> Arc<Entry> {
        self.domained(
            email,
            EntryKind::Account(AdminFlags {
                global_admin: false,
                delegated_admin: true,
            }),
        )
    }

    /// Global admin account
    pub fn global_admin(&self, email: &str) -> Arc<Entry> {
        self.domained(
            email,
            EntryKind::Account(AdminFlags {
                global_admin: true,
                delegated_admin: false,
            }),
        )
    }

    /// Calendar resource
    pub fn cal_resource(&self, email: &str) -> Arc<Entry> {
        self.domained(email, EntryKind::CalResource(AdminFlags::default()))
    }

    /// Static distribution list
    pub fn distribution_list(&self, email: &str, admin_group: bool) -> Arc<Entry> {
        self.domained(email, EntryKind::DistributionList { admin_group })
    }

    /// Dynamic group
    pub fn dynamic_group(&self, email: &str, admin_group: bool) -> Arc<Entry> {
        self.domained(email, EntryKind::DynamicGroup { admin_group })
    }

    /// Class of service
    pub fn cos(&self, name: &str) -> Arc<Entry> {
        self.directory
            .add_entry(Entry::new(EntryId::from_name(name), name, EntryKind::Cos))
    }

    /// The global grant entry
    pub fn global_grant(&self) -> Arc<Entry> {
        self.directory.global_grant().unwrap()
    }

    /// Make `member` a direct member of `group`
    pub fn add_member(&self, group: &Entry, member: &Entry) {
        self.directory.add_member(group.id, member.id);
    }

    /// Store grants on `target`, panicking on validation errors
    pub fn grant(&self, target: &Entry, grants: &[Grant]) -> Vec<Grant> {
        self.acl_store().grant(target, grants).unwrap()
    }

    /// Parse an ACE line and store it on `target`
    pub fn grant_ace(&self, target: &Entry, ace: &str) -> Grant {
        let grant = Grant::parse(ace, &self.catalog).unwrap();
        self.grant(target, std::slice::from_ref(&grant));
        grant
    }

    /// Grants stored on `target`; empty when there are none
    pub fn acl(&self, target: &Entry) -> GrantSet {
        self.acl_store()
            .grant_set(target)
            .unwrap()
            .map(|set| (*set).clone())
            .unwrap_or_default()
    }

    /// Principal for an entry
    pub fn principal(&self, entry: &Arc<Entry>) -> Principal {
        Principal::from(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_builds() {
        let catalog = standard_catalog();
        assert!(catalog.get("domainAdminRights").unwrap().is_combo());
        assert!(catalog.cache_slot_count() > 0);
    }

    #[test]
    fn test_world_reuses_domains() {
        let world = World::new();
        let a = world.account("a@example.com");
        let b = world.account("b@example.com");
        assert_eq!(a.domain_id, b.domain_id);
        assert_eq!(a.domain_id, Some(world.domain("example.com").id));
    }
}
