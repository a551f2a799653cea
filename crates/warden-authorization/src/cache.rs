//! Permission cache contract and an in-memory implementation
//!
//! The cache memoizes `(grantee, target, right, delegate)` decisions. Only
//! rights with a catalog cache slot and principals backed by a directory entry
//! are cached. A grant or revoke on an account drops that account's decisions.
//! A grant or revoke on any other entry can reach many targets through
//! inheritance, so it drops every cached decision.

use crate::decision::Decision;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use warden_core::config::PermissionCacheConfig;
use warden_core::{Entry, EntryId, Principal, Right};

/// Result of a cache probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedPermission {
    /// Nothing cached for the key
    NotCached,
    /// A previously computed decision
    Cached(Decision),
}

/// Memo of right-check decisions
pub trait PermissionCache: Send + Sync {
    /// Probe the cache
    fn get(&self, grantee: &Principal, target: &Entry, right: &Right, delegate: bool)
        -> CachedPermission;

    /// Record a decision
    fn put(
        &self,
        grantee: &Principal,
        target: &Entry,
        right: &Right,
        delegate: bool,
        decision: Decision,
    );

    /// Drop every decision that an ACL change on `target` may have affected
    ///
    /// Grants on domains, groups, classes of service and the global grant
    /// entry are inherited by other targets.
    fn invalidate(&self, target: &Entry);
}

/// Decisions of one grantee on one target, indexed by cache slot
#[derive(Debug, Clone, Default)]
struct SlotTable {
    execute: Vec<Option<Decision>>,
    delegate: Vec<Option<Decision>>,
}

impl SlotTable {
    fn lane(&self, delegate: bool) -> &Vec<Option<Decision>> {
        if delegate {
            &self.delegate
        } else {
            &self.execute
        }
    }

    fn lane_mut(&mut self, delegate: bool) -> &mut Vec<Option<Decision>> {
        if delegate {
            &mut self.delegate
        } else {
            &mut self.execute
        }
    }

    fn get(&self, slot: usize, delegate: bool) -> Option<Decision> {
        self.lane(delegate).get(slot).copied().flatten()
    }

    fn set(&mut self, slot: usize, delegate: bool, decision: Decision) {
        let lane = self.lane_mut(delegate);
        if lane.len() <= slot {
            lane.resize(slot + 1, None);
        }
        lane[slot] = Some(decision);
    }
}

/// Bounded in-memory permission cache
///
/// Targets are evicted oldest-first once `max_targets` is exceeded.
#[derive(Debug)]
pub struct MemoryPermissionCache {
    targets: RwLock<IndexMap<EntryId, HashMap<EntryId, SlotTable>>>,
    max_targets: usize,
}

impl MemoryPermissionCache {
    /// Cache holding at most `max_targets` targets
    pub fn new(max_targets: usize) -> Self {
        Self {
            targets: RwLock::new(IndexMap::new()),
            max_targets: max_targets.max(1),
        }
    }

    /// Cache sized from configuration
    pub fn from_config(config: &PermissionCacheConfig) -> Self {
        Self::new(config.max_targets)
    }

    /// Number of targets with cached decisions
    pub fn target_count(&self) -> usize {
        self.targets.read().len()
    }

    fn key(grantee: &Principal, right: &Right) -> Option<(EntryId, usize)> {
        Some((grantee.id()?, right.cache_slot()?))
    }
}

impl PermissionCache for MemoryPermissionCache {
    fn get(
        &self,
        grantee: &Principal,
        target: &Entry,
        right: &Right,
        delegate: bool,
    ) -> CachedPermission {
        let Some((grantee_id, slot)) = Self::key(grantee, right) else {
            return CachedPermission::NotCached;
        };
        self.targets
            .read()
            .get(&target.id)
            .and_then(|grantees| grantees.get(&grantee_id))
            .and_then(|table| table.get(slot, delegate))
            .map_or(CachedPermission::NotCached, CachedPermission::Cached)
    }

    fn put(
        &self,
        grantee: &Principal,
        target: &Entry,
        right: &Right,
        delegate: bool,
        decision: Decision,
    ) {
        let Some((grantee_id, slot)) = Self::key(grantee, right) else {
            return;
        };
        if target.is_pseudo() {
            return;
        }
        let mut targets = self.targets.write();
        targets
            .entry(target.id)
            .or_default()
            .entry(grantee_id)
            .or_default()
            .set(slot, delegate, decision);
        while targets.len() > self.max_targets {
            if let Some((evicted, _)) = targets.shift_remove_index(0) {
                tracing::debug!(entry = %evicted, "evicted permission cache target");
            }
        }
    }

    fn invalidate(&self, target: &Entry) {
        let mut targets = self.targets.write();
        if target.is_account() {
            if targets.shift_remove(&target.id).is_some() {
                tracing::debug!(entry = %target.name, "invalidated permission cache target");
            }
        } else if !targets.is_empty() {
            let dropped = targets.len();
            targets.clear();
            tracing::debug!(entry = %target.name, dropped, "cleared permission cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_core::{AdminFlags, EntryKind, RightCatalog, RightDefinition, TargetType};

    fn fixtures() -> (Principal, Arc<Entry>, RightCatalog) {
        let user = Arc::new(Entry::new(
            EntryId::from_name("u"),
            "u@example.com",
            EntryKind::Account(AdminFlags::default()),
        ));
        let target = Arc::new(Entry::new(
            EntryId::from_name("t"),
            "t@example.com",
            EntryKind::Account(AdminFlags::default()),
        ));
        let mut builder = RightCatalog::builder();
        builder
            .define(&RightDefinition::preset("sendAs", TargetType::Account, true).cacheable())
            .unwrap();
        builder
            .define(&RightDefinition::preset("viewFreeBusy", TargetType::Account, true))
            .unwrap();
        (Principal::Entry(user), target, builder.build())
    }

    #[test]
    fn test_put_get_invalidate() {
        let (user, target, catalog) = fixtures();
        let right = catalog.lookup("sendAs").unwrap();
        let cache = MemoryPermissionCache::new(8);

        assert_eq!(
            cache.get(&user, &target, &right, false),
            CachedPermission::NotCached
        );
        cache.put(&user, &target, &right, false, Decision::Deny);
        assert_eq!(
            cache.get(&user, &target, &right, false),
            CachedPermission::Cached(Decision::Deny)
        );
        assert_eq!(
            cache.get(&user, &target, &right, true),
            CachedPermission::NotCached
        );

        cache.invalidate(&target);
        assert_eq!(
            cache.get(&user, &target, &right, false),
            CachedPermission::NotCached
        );
    }

    #[test]
    fn test_inherited_acl_change_clears_all_targets() {
        let (user, target, catalog) = fixtures();
        let right = catalog.lookup("sendAs").unwrap();
        let cache = MemoryPermissionCache::new(8);
        let other = Entry::new(
            EntryId::from_name("o"),
            "o@example.com",
            EntryKind::Account(AdminFlags::default()),
        );
        cache.put(&user, &target, &right, false, Decision::Allow);
        cache.put(&user, &other, &right, false, Decision::NoDecision);

        cache.invalidate(&other);
        assert_eq!(cache.target_count(), 1);

        let domain = Entry::new(EntryId::from_name("example.com"), "example.com", EntryKind::Domain);
        cache.invalidate(&domain);
        assert_eq!(cache.target_count(), 0);
        assert_eq!(
            cache.get(&user, &target, &right, false),
            CachedPermission::NotCached
        );
    }

    #[test]
    fn test_uncacheable_rights_and_principals_skipped() {
        let (user, target, catalog) = fixtures();
        let cache = MemoryPermissionCache::new(8);
        let plain = catalog.lookup("viewFreeBusy").unwrap();
        cache.put(&user, &target, &plain, false, Decision::Allow);
        assert_eq!(cache.target_count(), 0);

        let cacheable = catalog.lookup("sendAs").unwrap();
        cache.put(&Principal::Anonymous, &target, &cacheable, false, Decision::Allow);
        assert_eq!(cache.target_count(), 0);
    }

    #[test]
    fn test_oldest_target_evicted() {
        let (user, _, catalog) = fixtures();
        let right = catalog.lookup("sendAs").unwrap();
        let cache = MemoryPermissionCache::new(2);
        let targets: Vec<_> = (0..3)
            .map(|i| {
                Entry::new(
                    EntryId::from_name(&format!("t{i}")),
                    format!("t{i}@example.com"),
                    EntryKind::Account(AdminFlags::default()),
                )
            })
            .collect();
        for t in &targets {
            cache.put(&user, t, &right, false, Decision::Allow);
        }
        assert_eq!(cache.target_count(), 2);
        assert_eq!(
            cache.get(&user, &targets[0], &right, false),
            CachedPermission::NotCached
        );
        assert_eq!(
            cache.get(&user, &targets[2], &right, false),
            CachedPermission::Cached(Decision::Allow)
        );
    }
}
