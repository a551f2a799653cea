//! Directory contract consumed by the authorization core
//!
//! The directory persists entries and their attributes. The core only needs
//! multi-valued attribute reads and writes, an entry-local cache slot, group
//! membership expansion and a handful of lookups.

mod memory;

pub use memory::MemoryDirectory;

use crate::errors::WardenResult;
use crate::grant::ExternalGroupRef;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use warden_core::{Entry, EntryId, Principal};

/// Opaque per-entry cached value
pub type CachedData = Arc<dyn Any + Send + Sync>;

/// Attribute writes keyed by attribute name; an empty list clears it
pub type AttrChanges = BTreeMap<String, Vec<String>>;

/// One group an entry belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberOf {
    /// Group id
    pub id: EntryId,
    /// Group is flagged as admin group
    pub admin_group: bool,
    /// Dynamic rather than static group
    pub dynamic: bool,
    /// Entry is a direct member, not a member through a nested group
    pub direct: bool,
}

/// Ordered, duplicate-free group membership of an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembership {
    groups: Vec<MemberOf>,
}

impl GroupMembership {
    /// Empty membership
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group unless already present
    pub fn append(&mut self, member_of: MemberOf) {
        if !self.contains(&member_of.id) {
            self.groups.push(member_of);
        }
    }

    /// Whether `id` is one of the groups
    pub fn contains(&self, id: &EntryId) -> bool {
        self.groups.iter().any(|g| g.id == *id)
    }

    /// Whether the group id rendered as text is one of the groups
    pub fn contains_str(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g.id.to_string() == id)
    }

    /// Groups in directory order
    pub fn groups(&self) -> &[MemberOf] {
        &self.groups
    }

    /// Group ids in directory order
    pub fn group_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.groups.iter().map(|g| g.id)
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// No groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<MemberOf> for GroupMembership {
    fn from_iter<T: IntoIterator<Item = MemberOf>>(iter: T) -> Self {
        let mut membership = Self::new();
        for member_of in iter {
            membership.append(member_of);
        }
        membership
    }
}

/// Storage and lookup operations the core consumes
pub trait Directory: Send + Sync {
    /// All values of a multi-valued attribute
    fn multi_attr(&self, entry: &Entry, attr: &str) -> WardenResult<Vec<String>>;

    /// Entry-local cached value
    fn cached_data(&self, entry: &Entry, key: &str) -> Option<CachedData>;

    /// Attach a cached value to an entry
    fn set_cached_data(&self, entry: &Entry, key: &str, data: CachedData);

    /// Write attributes; must drop every cached value of the entry
    fn modify_attrs(&self, entry: &Entry, changes: &AttrChanges) -> WardenResult<()>;

    /// Transitive group membership, optionally limited to admin groups
    fn group_membership(&self, entry: &Entry, admin_only: bool) -> WardenResult<GroupMembership>;

    /// Domain owning a domained entry
    fn domain_of(&self, entry: &Entry) -> WardenResult<Option<Arc<Entry>>>;

    /// Domain by its DNS name
    fn domain_by_name(&self, name: &str) -> WardenResult<Option<Arc<Entry>>>;

    /// Any entry by id
    fn entry_by_id(&self, id: &EntryId) -> WardenResult<Option<Arc<Entry>>>;

    /// The synthetic global grant entry
    fn global_grant(&self) -> WardenResult<Arc<Entry>>;

    /// Membership probe against an external directory group
    ///
    /// Returns `None` when the group cannot be found.
    fn external_group_contains(
        &self,
        group: &ExternalGroupRef,
        principal: &Principal,
        as_admin: bool,
    ) -> WardenResult<Option<bool>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_dedups() {
        let id = EntryId::from_name("g");
        let membership: GroupMembership = [
            MemberOf {
                id,
                admin_group: false,
                dynamic: false,
                direct: true,
            },
            MemberOf {
                id,
                admin_group: false,
                dynamic: false,
                direct: false,
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(membership.len(), 1);
        assert!(membership.groups()[0].direct);
        assert!(membership.contains_str(&id.to_string()));
    }
}
