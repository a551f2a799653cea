//! Ancestor chains of target entries
//!
//! [`ancestors_of`] yields the entries a target inherits grants from. The first
//! item is always the target itself, which the checker consumes separately;
//! the chain always ends at the global grant entry.

use crate::directory::{Directory, MemberOf};
use crate::errors::WardenResult;
use std::collections::VecDeque;
use std::sync::Arc;
use warden_core::{Entry, EntryKind, PseudoDomain};

/// One step of an ancestor chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ancestor {
    /// The target itself
    Target(Arc<Entry>),
    /// A group the target belongs to
    Group {
        /// Group entry
        entry: Arc<Entry>,
        /// Target is a direct member of the group
        direct: bool,
    },
    /// The target's domain, or a parent domain of a domain target
    Domain(Arc<Entry>),
    /// The global grant entry
    Global(Arc<Entry>),
}

impl Ancestor {
    /// Entry the grants are read from
    pub fn entry(&self) -> &Arc<Entry> {
        match self {
            Ancestor::Target(entry)
            | Ancestor::Group { entry, .. }
            | Ancestor::Domain(entry)
            | Ancestor::Global(entry) => entry,
        }
    }

    /// Group ancestor
    pub fn is_group(&self) -> bool {
        matches!(self, Ancestor::Group { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Target,
    Groups,
    Domain,
    ParentDomains,
    Global,
    Done,
}

/// Finite, non-restartable ancestor sequence
pub struct Ancestors<'a> {
    directory: &'a dyn Directory,
    target: Arc<Entry>,
    expand_groups: bool,
    stage: Stage,
    groups: Option<VecDeque<MemberOf>>,
    parent_domains: Option<VecDeque<String>>,
}

/// Ancestor chain of `target`
///
/// Group ancestors are only produced for accounts, calendar resources and
/// distribution lists, and only when `expand_groups` is set.
pub fn ancestors_of(
    directory: &dyn Directory,
    target: Arc<Entry>,
    expand_groups: bool,
) -> Ancestors<'_> {
    Ancestors {
        directory,
        target,
        expand_groups,
        stage: Stage::Target,
        groups: None,
        parent_domains: None,
    }
}

impl<'a> Ancestors<'a> {
    fn after_target(&self) -> Stage {
        match self.target.kind {
            EntryKind::Account(_)
            | EntryKind::CalResource(_)
            | EntryKind::DistributionList { .. } => {
                if self.expand_groups {
                    Stage::Groups
                } else {
                    Stage::Domain
                }
            }
            EntryKind::DynamicGroup { .. } => Stage::Domain,
            EntryKind::Domain => Stage::ParentDomains,
            EntryKind::GlobalGrant => Stage::Done,
            EntryKind::Cos
            | EntryKind::Server
            | EntryKind::UcService
            | EntryKind::XmppComponent
            | EntryKind::Zimlet
            | EntryKind::Config => Stage::Global,
        }
    }

    fn next_group(&mut self) -> Option<Ancestor> {
        let directory = self.directory;
        let target = &self.target;
        let groups = self.groups.get_or_insert_with(|| {
            if target.is_pseudo() {
                return VecDeque::new();
            }
            match directory.group_membership(target, false) {
                Ok(membership) => membership.groups().iter().cloned().collect(),
                Err(e) => {
                    tracing::warn!(target = %target.name, error = %e, "unable to resolve target groups");
                    VecDeque::new()
                }
            }
        });

        while let Some(member_of) = groups.pop_front() {
            match directory.entry_by_id(&member_of.id) {
                Ok(Some(entry)) => {
                    return Some(Ancestor::Group {
                        entry,
                        direct: member_of.direct,
                    })
                }
                Ok(None) => {
                    tracing::warn!(group = %member_of.id, target = %target.name, "group not found");
                }
                Err(e) => {
                    tracing::warn!(group = %member_of.id, error = %e, "unable to load group");
                }
            }
        }
        None
    }

    fn own_domain(&self) -> Option<Ancestor> {
        if matches!(self.target.pseudo, Some(PseudoDomain::Synthetic(_))) {
            return None;
        }
        match self.directory.domain_of(&self.target) {
            Ok(Some(domain)) => Some(Ancestor::Domain(domain)),
            Ok(None) => {
                tracing::warn!(target = %self.target.name, "target has no domain");
                None
            }
            Err(e) => {
                tracing::warn!(target = %self.target.name, error = %e, "unable to resolve target domain");
                None
            }
        }
    }

    fn next_parent_domain(&mut self) -> Option<Ancestor> {
        let target_name = self.target.name.clone();
        let names = self.parent_domains.get_or_insert_with(|| {
            let labels: Vec<&str> = target_name.split('.').collect();
            (1..labels.len()).map(|i| labels[i..].join(".")).collect()
        });

        while let Some(name) = names.pop_front() {
            match self.directory.domain_by_name(&name) {
                Ok(Some(domain)) => return Some(Ancestor::Domain(domain)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(domain = %name, error = %e, "unable to look up parent domain");
                }
            }
        }
        None
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = WardenResult<Ancestor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stage {
                Stage::Target => {
                    self.stage = self.after_target();
                    return Some(Ok(Ancestor::Target(Arc::clone(&self.target))));
                }
                Stage::Groups => {
                    if let Some(group) = self.next_group() {
                        return Some(Ok(group));
                    }
                    self.stage = Stage::Domain;
                }
                Stage::Domain => {
                    self.stage = Stage::Global;
                    if let Some(domain) = self.own_domain() {
                        return Some(Ok(domain));
                    }
                }
                Stage::ParentDomains => {
                    if let Some(domain) = self.next_parent_domain() {
                        return Some(Ok(domain));
                    }
                    self.stage = Stage::Global;
                }
                Stage::Global => {
                    self.stage = Stage::Done;
                    return Some(self.directory.global_grant().map(Ancestor::Global));
                }
                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use warden_core::{AdminFlags, EntryId};

    fn names(dir: &MemoryDirectory, target: Arc<Entry>, expand: bool) -> Vec<String> {
        ancestors_of(dir, target, expand)
            .map(|a| a.unwrap().entry().name.clone())
            .collect()
    }

    fn domain(dir: &MemoryDirectory, name: &str) -> Arc<Entry> {
        dir.add_entry(Entry::new(EntryId::from_name(name), name, EntryKind::Domain))
    }

    #[test]
    fn test_account_chain_with_groups() {
        let dir = MemoryDirectory::new();
        let d = domain(&dir, "example.com");
        let account = dir.add_entry(
            Entry::new(
                EntryId::from_name("a1"),
                "a1@example.com",
                EntryKind::Account(AdminFlags::default()),
            )
            .in_domain(d.id),
        );
        let g1 = dir.add_entry(Entry::new(
            EntryId::from_name("g1"),
            "g1@example.com",
            EntryKind::DistributionList { admin_group: false },
        ));
        let g2 = dir.add_entry(Entry::new(
            EntryId::from_name("g2"),
            "g2@example.com",
            EntryKind::DistributionList { admin_group: false },
        ));
        dir.add_member(g1.id, account.id);
        dir.add_member(g2.id, g1.id);

        assert_eq!(
            names(&dir, account.clone(), true),
            vec![
                "a1@example.com",
                "g1@example.com",
                "g2@example.com",
                "example.com",
                "globalgrant"
            ]
        );
        assert_eq!(
            names(&dir, account.clone(), false),
            vec!["a1@example.com", "example.com", "globalgrant"]
        );

        let chain: Vec<_> = ancestors_of(&dir, account, true)
            .filter_map(Result::ok)
            .collect();
        assert_eq!(
            chain[1],
            Ancestor::Group {
                entry: g1,
                direct: true
            }
        );
        assert_eq!(
            chain[2],
            Ancestor::Group {
                entry: g2,
                direct: false
            }
        );
    }

    #[test]
    fn test_domain_chain_skips_missing_parents() {
        let dir = MemoryDirectory::new();
        domain(&dir, "example.com");
        let child = domain(&dir, "eng.west.example.com");
        assert_eq!(
            names(&dir, child, true),
            vec!["eng.west.example.com", "example.com", "globalgrant"]
        );
    }

    #[test]
    fn test_dynamic_group_skips_groups() {
        let dir = MemoryDirectory::new();
        let d = domain(&dir, "example.com");
        let dynamic = dir.add_entry(
            Entry::new(
                EntryId::from_name("dyn"),
                "dyn@example.com",
                EntryKind::DynamicGroup { admin_group: false },
            )
            .in_domain(d.id),
        );
        let parent = dir.add_entry(Entry::new(
            EntryId::from_name("p"),
            "p@example.com",
            EntryKind::DistributionList { admin_group: false },
        ));
        dir.add_member(parent.id, dynamic.id);
        assert_eq!(
            names(&dir, dynamic, true),
            vec!["dyn@example.com", "example.com", "globalgrant"]
        );
    }

    #[test]
    fn test_flat_kinds_go_straight_to_global() {
        let dir = MemoryDirectory::new();
        let cos = dir.add_entry(Entry::new(EntryId::from_name("cos"), "default", EntryKind::Cos));
        assert_eq!(names(&dir, cos, true), vec!["default", "globalgrant"]);

        let global = dir.global_grant().unwrap();
        assert_eq!(names(&dir, global, true), vec!["globalgrant"]);
    }

    #[test]
    fn test_pseudo_account_with_synthetic_domain() {
        let dir = MemoryDirectory::new();
        let synthetic = Arc::new(Entry::new(
            EntryId::from_name("new.example.org"),
            "new.example.org",
            EntryKind::Domain,
        ));
        let pseudo = Arc::new(
            Entry::new(
                EntryId::from_name("pseudo"),
                "pseudo@new.example.org",
                EntryKind::Account(AdminFlags::default()),
            )
            .as_pseudo(PseudoDomain::Synthetic(synthetic)),
        );
        assert_eq!(
            names(&dir, pseudo, true),
            vec!["pseudo@new.example.org", "globalgrant"]
        );
    }

    #[test]
    fn test_pseudo_account_in_existing_domain() {
        let dir = MemoryDirectory::new();
        let d = domain(&dir, "example.com");
        let pseudo = Arc::new(
            Entry::new(
                EntryId::from_name("pseudo"),
                "pseudo@example.com",
                EntryKind::Account(AdminFlags::default()),
            )
            .in_domain(d.id)
            .as_pseudo(PseudoDomain::Existing),
        );
        assert_eq!(
            names(&dir, pseudo, true),
            vec!["pseudo@example.com", "example.com", "globalgrant"]
        );
    }
}
