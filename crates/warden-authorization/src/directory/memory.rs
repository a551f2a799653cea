//! In-memory directory
//!
//! Backs tests, fixtures and the CLI. Group membership is stored as direct
//! parent edges and expanded breadth-first on demand.

use super::{AttrChanges, CachedData, Directory, GroupMembership, MemberOf};
use crate::errors::{WardenError, WardenResult};
use crate::grant::ExternalGroupRef;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use warden_core::{Entry, EntryId, EntryKind, Principal, PseudoDomain};

#[derive(Debug, Default)]
struct Inner {
    entries: IndexMap<EntryId, Arc<Entry>>,
    domains_by_name: HashMap<String, EntryId>,
    attrs: HashMap<EntryId, BTreeMap<String, Vec<String>>>,
    cache: HashMap<EntryId, HashMap<String, CachedData>>,
    parents: HashMap<EntryId, Vec<EntryId>>,
    external_groups: HashMap<String, HashSet<String>>,
    writes: usize,
}

/// Directory held entirely in memory
#[derive(Debug)]
pub struct MemoryDirectory {
    inner: RwLock<Inner>,
    global_grant: Arc<Entry>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    /// Empty directory with only the global grant entry
    pub fn new() -> Self {
        let global_grant = Arc::new(Entry::new(
            EntryId::from_name("globalgrant"),
            "globalgrant",
            EntryKind::GlobalGrant,
        ));
        let mut inner = Inner::default();
        inner
            .entries
            .insert(global_grant.id, Arc::clone(&global_grant));
        Self {
            inner: RwLock::new(inner),
            global_grant,
        }
    }

    /// Store an entry, replacing any entry with the same id
    pub fn add_entry(&self, entry: Entry) -> Arc<Entry> {
        let entry = Arc::new(entry);
        let mut inner = self.inner.write();
        if matches!(entry.kind, EntryKind::Domain) {
            inner
                .domains_by_name
                .insert(entry.name.to_lowercase(), entry.id);
        }
        inner.entries.insert(entry.id, Arc::clone(&entry));
        inner.cache.remove(&entry.id);
        entry
    }

    /// Record `member` as a direct member of `group`
    pub fn add_member(&self, group: EntryId, member: EntryId) {
        let mut inner = self.inner.write();
        let parents = inner.parents.entry(member).or_default();
        if !parents.contains(&group) {
            parents.push(group);
        }
    }

    /// Replace a multi-valued attribute without touching caches
    pub fn set_attr(&self, entry: EntryId, attr: &str, values: Vec<String>) {
        self.inner
            .write()
            .attrs
            .entry(entry)
            .or_default()
            .insert(attr.to_string(), values);
    }

    /// Register an external group and its member emails
    pub fn add_external_group(&self, group: &ExternalGroupRef, members: &[&str]) {
        self.inner.write().external_groups.insert(
            group.to_string(),
            members.iter().map(|m| m.to_lowercase()).collect(),
        );
    }

    /// Entry by name, case-insensitively
    pub fn entry_by_name(&self, name: &str) -> Option<Arc<Entry>> {
        self.inner
            .read()
            .entries
            .values()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Number of successful `modify_attrs` calls
    pub fn write_count(&self) -> usize {
        self.inner.read().writes
    }
}

impl Directory for MemoryDirectory {
    fn multi_attr(&self, entry: &Entry, attr: &str) -> WardenResult<Vec<String>> {
        Ok(self
            .inner
            .read()
            .attrs
            .get(&entry.id)
            .and_then(|attrs| attrs.get(attr))
            .cloned()
            .unwrap_or_default())
    }

    fn cached_data(&self, entry: &Entry, key: &str) -> Option<CachedData> {
        self.inner
            .read()
            .cache
            .get(&entry.id)
            .and_then(|slots| slots.get(key))
            .cloned()
    }

    fn set_cached_data(&self, entry: &Entry, key: &str, data: CachedData) {
        self.inner
            .write()
            .cache
            .entry(entry.id)
            .or_default()
            .insert(key.to_string(), data);
    }

    fn modify_attrs(&self, entry: &Entry, changes: &AttrChanges) -> WardenResult<()> {
        let mut inner = self.inner.write();
        if !inner.entries.contains_key(&entry.id) {
            return Err(WardenError::not_found(format!(
                "no such entry: {} ({})",
                entry.name, entry.id
            )));
        }
        let attrs = inner.attrs.entry(entry.id).or_default();
        for (attr, values) in changes {
            if values.is_empty() {
                attrs.remove(attr);
            } else {
                attrs.insert(attr.clone(), values.clone());
            }
        }
        inner.cache.remove(&entry.id);
        inner.writes += 1;
        Ok(())
    }

    fn group_membership(&self, entry: &Entry, admin_only: bool) -> WardenResult<GroupMembership> {
        let inner = self.inner.read();
        let mut membership = GroupMembership::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<(EntryId, bool)> = inner
            .parents
            .get(&entry.id)
            .map(|ps| ps.iter().map(|p| (*p, true)).collect())
            .unwrap_or_default();

        while let Some((group_id, direct)) = queue.pop_front() {
            if !seen.insert(group_id) {
                continue;
            }
            let Some(group) = inner.entries.get(&group_id) else {
                tracing::warn!(group = %group_id, member = %entry.name, "dangling group membership");
                continue;
            };
            if !admin_only || group.is_admin_group() {
                membership.append(MemberOf {
                    id: group_id,
                    admin_group: group.is_admin_group(),
                    dynamic: matches!(group.kind, EntryKind::DynamicGroup { .. }),
                    direct,
                });
            }
            if let Some(parents) = inner.parents.get(&group_id) {
                queue.extend(parents.iter().map(|p| (*p, false)));
            }
        }
        Ok(membership)
    }

    fn domain_of(&self, entry: &Entry) -> WardenResult<Option<Arc<Entry>>> {
        if let Some(PseudoDomain::Synthetic(domain)) = &entry.pseudo {
            return Ok(Some(Arc::clone(domain)));
        }
        let Some(domain_id) = entry.domain_id else {
            return Ok(None);
        };
        Ok(self.inner.read().entries.get(&domain_id).cloned())
    }

    fn domain_by_name(&self, name: &str) -> WardenResult<Option<Arc<Entry>>> {
        let inner = self.inner.read();
        Ok(inner
            .domains_by_name
            .get(&name.to_lowercase())
            .and_then(|id| inner.entries.get(id))
            .cloned())
    }

    fn entry_by_id(&self, id: &EntryId) -> WardenResult<Option<Arc<Entry>>> {
        Ok(self.inner.read().entries.get(id).cloned())
    }

    fn global_grant(&self) -> WardenResult<Arc<Entry>> {
        Ok(Arc::clone(&self.global_grant))
    }

    fn external_group_contains(
        &self,
        group: &ExternalGroupRef,
        principal: &Principal,
        _as_admin: bool,
    ) -> WardenResult<Option<bool>> {
        let inner = self.inner.read();
        let Some(members) = inner.external_groups.get(&group.to_string()) else {
            return Ok(None);
        };
        let name = principal.display_name().to_lowercase();
        Ok(Some(members.contains(&name)))
    }
}
