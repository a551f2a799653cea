//! All grants stored on one directory entry
//!
//! A [`GrantSet`] is a value: mutation happens on a clone, and the clone is
//! written back through the directory. Readers holding an `Arc<GrantSet>` keep
//! seeing the set they loaded.

use crate::errors::WardenResult;
use crate::grant::{Grant, GrantOrigin};
use std::collections::HashSet;
use warden_core::{Entry, RightCatalog};

/// Grants stored on a single entry, partitioned by polarity and delegability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    allowed_not_delegable: Vec<Grant>,
    allowed_delegable: Vec<Grant>,
    denied: Vec<Grant>,
}

impl GrantSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from grants, applying the usual merge rules
    pub fn from_grants(grants: impl IntoIterator<Item = Grant>) -> Self {
        let mut set = Self::new();
        for grant in grants {
            set.insert(grant);
        }
        set
    }

    /// Parse the persisted ACE lines of `entry`
    ///
    /// A single malformed line fails the whole set.
    pub fn parse<S: AsRef<str>>(
        aces: &[S],
        catalog: &RightCatalog,
        entry: &Entry,
    ) -> WardenResult<Self> {
        let origin = GrantOrigin {
            target_type: entry.target_type(),
            target_name: entry.name.clone(),
        };
        let mut set = Self::new();
        for ace in aces {
            let grant = Grant::parse(ace.as_ref(), catalog)?.with_origin(origin.clone());
            set.insert(grant);
        }
        Ok(set)
    }

    /// Wire encoding of every grant, in [`all`](Self::all) order
    pub fn serialize(&self) -> Vec<String> {
        self.all().map(Grant::serialize).collect()
    }

    /// No grants stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of grants
    pub fn len(&self) -> usize {
        self.allowed_not_delegable.len() + self.allowed_delegable.len() + self.denied.len()
    }

    /// All grants: denied first, then delegable, then execute-only
    pub fn all(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.denied
            .iter()
            .chain(self.allowed_delegable.iter())
            .chain(self.allowed_not_delegable.iter())
    }

    /// Positive grants that cannot be delegated
    pub fn allowed_not_delegable(&self) -> &[Grant] {
        &self.allowed_not_delegable
    }

    /// Positive grants that can be delegated
    pub fn allowed_delegable(&self) -> &[Grant] {
        &self.allowed_delegable
    }

    /// Negative grants
    pub fn denied(&self) -> &[Grant] {
        &self.denied
    }

    /// Grants whose right is one of `rights`
    pub fn for_rights<'a>(&'a self, rights: &'a HashSet<String>) -> impl Iterator<Item = &'a Grant> {
        self.all().filter(move |g| rights.contains(g.right().name()))
    }

    fn bucket_mut(&mut self, grant: &Grant) -> &mut Vec<Grant> {
        if grant.is_deny() {
            &mut self.denied
        } else if grant.can_delegate() {
            &mut self.allowed_delegable
        } else {
            &mut self.allowed_not_delegable
        }
    }

    fn remove_where(&mut self, mut pred: impl FnMut(&Grant) -> bool) -> Vec<Grant> {
        let mut removed = Vec::new();
        for bucket in [
            &mut self.denied,
            &mut self.allowed_delegable,
            &mut self.allowed_not_delegable,
        ] {
            let mut i = 0;
            while i < bucket.len() {
                if pred(&bucket[i]) {
                    removed.push(bucket.remove(i));
                } else {
                    i += 1;
                }
            }
        }
        removed
    }

    /// Insert one grant; returns whether the set changed
    ///
    /// A grant for the same grantee and right replaces the existing one, so
    /// one grantee never holds both an allow and a deny for a right.
    fn insert(&mut self, grant: Grant) -> bool {
        if self.all().any(|existing| *existing == grant) {
            return false;
        }
        self.remove_where(|existing| existing.same_slot(&grant));
        self.bucket_mut(&grant).push(grant);
        true
    }

    /// Merge grants into this set, returning those that were added or changed
    ///
    /// Callers are expected to work on a private clone and validate grants
    /// first; see [`AclStore`](crate::acl::AclStore).
    pub fn grant(&mut self, grants: impl IntoIterator<Item = Grant>) -> Vec<Grant> {
        let mut granted = Vec::new();
        for grant in grants {
            if self.insert(grant.clone()) {
                granted.push(grant);
            }
        }
        granted
    }

    /// Remove grants matching grantee, type, right and modifier
    ///
    /// Revoking something that was never granted is not an error; it simply
    /// does not appear in the returned list.
    pub fn revoke<'a>(&mut self, grants: impl IntoIterator<Item = &'a Grant>) -> Vec<Grant> {
        let mut revoked = Vec::new();
        for grant in grants {
            revoked.extend(self.remove_where(|existing| existing.same_identity(grant)));
        }
        revoked
    }
}
