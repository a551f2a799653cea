//! Grantee matching and specificity ordering
//!
//! The resolver answers "does this principal match this grant" for one check.
//! The principal's group membership is fetched at most once, lazily, the first
//! time a group grant needs it.

use crate::directory::{Directory, GroupMembership, MemberOf};
use crate::errors::WardenResult;
use crate::grant::{ExternalGroupRef, Grant};
use once_cell::unsync::OnceCell;
use warden_core::{GranteeFlags, GranteeType, Principal};

/// One specificity tier of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// Flags a grantee type must carry to be considered in this tier
    pub flags: GranteeFlags,
    /// Grantees in this tier are matched through group membership
    pub via_groups: bool,
}

/// Tiers in the order they are evaluated, most specific first
///
/// Individual grantees come first; for admin rights they must also be admin
/// eligible. Domain, authenticated-user and public grantees only apply to
/// user rights.
pub fn specificity_tiers(user_right: bool) -> Vec<Tier> {
    let individual = if user_right {
        GranteeFlags::INDIVIDUAL
    } else {
        GranteeFlags::INDIVIDUAL | GranteeFlags::ADMIN
    };
    let mut tiers = vec![
        Tier {
            flags: individual,
            via_groups: false,
        },
        Tier {
            flags: GranteeFlags::GROUP,
            via_groups: true,
        },
    ];
    if user_right {
        tiers.extend(
            [
                GranteeFlags::DOMAIN,
                GranteeFlags::AUTH_USER,
                GranteeFlags::PUBLIC,
            ]
            .into_iter()
            .map(|flags| Tier {
                flags,
                via_groups: false,
            }),
        );
    }
    tiers
}

/// Matches grants against one principal
pub struct GranteeResolver<'a> {
    directory: &'a dyn Directory,
    principal: &'a Principal,
    as_admin: bool,
    groups: OnceCell<GroupMembership>,
}

impl<'a> GranteeResolver<'a> {
    /// Resolver for `principal`; `as_admin` limits group membership to admin groups
    pub fn new(directory: &'a dyn Directory, principal: &'a Principal, as_admin: bool) -> Self {
        Self {
            directory,
            principal,
            as_admin,
            groups: OnceCell::new(),
        }
    }

    /// The principal being resolved
    pub fn principal(&self) -> &Principal {
        self.principal
    }

    /// Groups the principal belongs to, including itself when it is an eligible group
    ///
    /// A lookup failure is logged and treated as no membership.
    pub fn grantee_groups(&self) -> &GroupMembership {
        self.groups.get_or_init(|| {
            let Some(entry) = self.principal.entry() else {
                return GroupMembership::new();
            };
            let mut membership = match self.directory.group_membership(entry, self.as_admin) {
                Ok(membership) => membership,
                Err(e) => {
                    tracing::warn!(
                        grantee = %entry.name,
                        error = %e,
                        "unable to resolve grantee groups"
                    );
                    GroupMembership::new()
                }
            };
            if entry.is_group() && (!self.as_admin || entry.is_admin_group()) {
                membership.append(MemberOf {
                    id: entry.id,
                    admin_group: entry.is_admin_group(),
                    dynamic: false,
                    direct: true,
                });
            }
            membership
        })
    }

    /// Match through group membership, falling back to an external group probe
    pub fn matches_group(&self, grant: &Grant) -> WardenResult<bool> {
        if self.grantee_groups().contains_str(grant.grantee()) {
            return Ok(true);
        }
        if grant.grantee_type() == GranteeType::ExternalGroup {
            return self.matches_external_group(grant);
        }
        Ok(false)
    }

    fn matches_external_group(&self, grant: &Grant) -> WardenResult<bool> {
        let group = ExternalGroupRef::parse(grant.grantee())?;
        match self
            .directory
            .external_group_contains(&group, self.principal, self.as_admin)?
        {
            Some(found) => Ok(found),
            None => {
                tracing::warn!(grantee = %grant.grantee(), "unable to find external group grantee");
                Ok(false)
            }
        }
    }

    /// Whether the principal is the grantee of `grant`
    pub fn matches(&self, grant: &Grant) -> WardenResult<bool> {
        let grantee = grant.grantee();
        let principal = self.principal;

        if matches!(principal, Principal::Anonymous) {
            return Ok(grant.grantee_type() == GranteeType::Public);
        }

        Ok(match grant.grantee_type() {
            GranteeType::Public => true,
            GranteeType::AuthUser => principal.is_authenticated_account(),
            GranteeType::Group => self.grantee_groups().contains_str(grantee),
            GranteeType::ExternalGroup => self.matches_external_group(grant)?,
            GranteeType::Domain => principal
                .domain_id()
                .is_some_and(|id| id.to_string() == grantee),
            GranteeType::ExternalDomain => principal
                .domain_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(grantee)),
            GranteeType::User => principal.id().is_some_and(|id| id.to_string() == grantee),
            GranteeType::Guest => match principal {
                Principal::Guest(guest) => guest.matches(grantee, grant.secret()),
                _ => false,
            },
            GranteeType::Key => match principal {
                Principal::Guest(guest) => guest.matches_access_key(grantee, grant.secret()),
                _ => false,
            },
            GranteeType::Email => match principal {
                Principal::Guest(guest) => guest.matches(grantee, grant.secret()),
                Principal::Entry(entry) if entry.is_account() || entry.is_group() => {
                    entry.name.eq_ignore_ascii_case(grantee)
                }
                _ => false,
            },
        })
    }

    /// Match according to the tier the grant is evaluated in
    pub fn matches_in_tier(&self, grant: &Grant, tier: Tier) -> WardenResult<bool> {
        if tier.via_groups {
            self.matches_group(grant)
        } else {
            self.matches(grant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use std::sync::Arc;
    use warden_core::{
        AdminFlags, Entry, EntryId, EntryKind, GuestCredentials, RightCatalog, RightDefinition,
        TargetType,
    };

    struct Fixture {
        dir: MemoryDirectory,
        catalog: RightCatalog,
        domain: Arc<Entry>,
        user: Arc<Entry>,
        group: Arc<Entry>,
    }

    fn fixture() -> Fixture {
        let dir = MemoryDirectory::new();
        let domain = dir.add_entry(Entry::new(
            EntryId::from_name("example.com"),
            "example.com",
            EntryKind::Domain,
        ));
        let user = dir.add_entry(
            Entry::new(
                EntryId::from_name("u1"),
                "u1@example.com",
                EntryKind::Account(AdminFlags::default()),
            )
            .in_domain(domain.id),
        );
        let group = dir.add_entry(
            Entry::new(
                EntryId::from_name("g1"),
                "g1@example.com",
                EntryKind::DistributionList { admin_group: false },
            )
            .in_domain(domain.id),
        );
        dir.add_member(group.id, user.id);
        let mut builder = RightCatalog::builder();
        builder
            .define(&RightDefinition::preset("viewFreeBusy", TargetType::Account, true))
            .unwrap();
        Fixture {
            dir,
            catalog: builder.build(),
            domain,
            user,
            group,
        }
    }

    fn grant(f: &Fixture, grantee: &str, ty: GranteeType) -> Grant {
        Grant::allow(grantee, ty, f.catalog.lookup("viewFreeBusy").unwrap())
    }

    #[test]
    fn test_tier_order() {
        let user_tiers = specificity_tiers(true);
        assert_eq!(user_tiers.len(), 5);
        assert_eq!(user_tiers[0].flags, GranteeFlags::INDIVIDUAL);
        assert!(user_tiers[1].via_groups);
        assert_eq!(user_tiers[4].flags, GranteeFlags::PUBLIC);

        let admin_tiers = specificity_tiers(false);
        assert_eq!(admin_tiers.len(), 2);
        assert!(admin_tiers[0].flags.contains(GranteeFlags::ADMIN));
    }

    #[test]
    fn test_entry_principal_matching() {
        let f = fixture();
        let principal = Principal::Entry(f.user.clone());
        let resolver = GranteeResolver::new(&f.dir, &principal, false);

        assert!(resolver.matches(&grant(&f, &f.user.id.to_string(), GranteeType::User)).unwrap());
        assert!(resolver.matches(&grant(&f, &f.domain.id.to_string(), GranteeType::Domain)).unwrap());
        assert!(resolver.matches(&grant(&f, "EXAMPLE.com", GranteeType::ExternalDomain)).unwrap());
        assert!(resolver.matches(&grant(&f, "", GranteeType::AuthUser)).unwrap());
        assert!(resolver.matches(&grant(&f, "", GranteeType::Public)).unwrap());
        assert!(resolver.matches(&grant(&f, "U1@example.com", GranteeType::Email)).unwrap());
        assert!(resolver.matches_group(&grant(&f, &f.group.id.to_string(), GranteeType::Group)).unwrap());
        assert!(!resolver.matches(&grant(&f, "u1@example.com", GranteeType::Guest)).unwrap());
    }

    #[test]
    fn test_admin_resolver_ignores_plain_groups() {
        let f = fixture();
        let principal = Principal::Entry(f.user.clone());
        let resolver = GranteeResolver::new(&f.dir, &principal, true);
        assert!(resolver.grantee_groups().is_empty());
    }

    #[test]
    fn test_group_principal_includes_itself() {
        let f = fixture();
        let principal = Principal::Entry(f.group.clone());
        let resolver = GranteeResolver::new(&f.dir, &principal, false);
        assert!(resolver.grantee_groups().contains(&f.group.id));

        let admin = GranteeResolver::new(&f.dir, &principal, true);
        assert!(!admin.grantee_groups().contains(&f.group.id));
    }

    #[test]
    fn test_anonymous_matches_only_public() {
        let f = fixture();
        let principal = Principal::Anonymous;
        let resolver = GranteeResolver::new(&f.dir, &principal, false);
        assert!(resolver.matches(&grant(&f, "", GranteeType::Public)).unwrap());
        assert!(!resolver.matches(&grant(&f, "", GranteeType::AuthUser)).unwrap());
    }

    #[test]
    fn test_guest_and_key_matching() {
        let f = fixture();
        let right = f.catalog.lookup("viewFreeBusy").unwrap();
        let gst = Grant::new(
            "guest@other.org",
            GranteeType::Guest,
            right.clone(),
            None,
            Some("pw".into()),
        );
        let key = Grant::new(
            "guest@other.org",
            GranteeType::Key,
            right,
            None,
            Some("k1".into()),
        );

        let guest = Principal::Guest(GuestCredentials::with_password("guest@other.org", "pw"));
        let resolver = GranteeResolver::new(&f.dir, &guest, false);
        assert!(resolver.matches(&gst).unwrap());
        assert!(!resolver.matches(&key).unwrap());
        assert!(!resolver.matches(&grant(&f, "", GranteeType::AuthUser)).unwrap());
        assert!(resolver.matches(&grant(&f, "other.org", GranteeType::ExternalDomain)).unwrap());

        let keyed = Principal::Guest(GuestCredentials::with_access_key("guest@other.org", "k1"));
        let resolver = GranteeResolver::new(&f.dir, &keyed, false);
        assert!(resolver.matches(&key).unwrap());
        assert!(!resolver.matches(&gst).unwrap());
    }

    #[test]
    fn test_external_group_probe() {
        let f = fixture();
        let group = ExternalGroupRef {
            domain_id: f.domain.id.to_string(),
            group_email: "eng@corp.example".into(),
        };
        f.dir.add_external_group(&group, &["u1@example.com"]);
        let principal = Principal::Entry(f.user.clone());
        let resolver = GranteeResolver::new(&f.dir, &principal, false);

        let hit = grant(&f, &group.to_string(), GranteeType::ExternalGroup);
        assert!(resolver.matches_group(&hit).unwrap());

        let missing = grant(&f, "x:missing@corp.example", GranteeType::ExternalGroup);
        assert!(!resolver.matches_group(&missing).unwrap());
    }
}
