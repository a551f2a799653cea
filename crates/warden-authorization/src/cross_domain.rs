//! Cross-domain administration
//!
//! An admin from one domain may only benefit from grants made to a group
//! living in another domain when the target's domain grants `crossDomainAdmin`
//! to the admin's domain.

use crate::acl::AclStore;
use crate::decision::Decision;
use crate::errors::{WardenError, WardenResult};
use warden_core::{Entry, GranteeType, TargetType};

/// Resolve `crossDomainAdmin` from the grants stored directly on `target`
///
/// Only grants to `grantee_domain` itself are considered. Absent a matching
/// grant the answer is [`Decision::Deny`].
pub fn check_cross_domain_admin_right(
    acls: &AclStore<'_>,
    grantee_domain: &Entry,
    target: &Entry,
    delegate: bool,
) -> WardenResult<Decision> {
    if target.target_type() != TargetType::Domain {
        return Err(WardenError::invalid_request(format!(
            "crossDomainAdmin can only be checked on a domain, not {}",
            target.target_type()
        )));
    }

    let Some(acl) = acls.grant_set(target)? else {
        return Ok(Decision::Deny);
    };

    let grantee_id = grantee_domain.id.to_string();
    for grant in acl.all() {
        if !grant.right().is_cross_domain_admin()
            || grant.grantee_type() != GranteeType::Domain
            || grant.grantee() != grantee_id
        {
            continue;
        }
        if grant.is_deny() {
            return Ok(Decision::Deny);
        }
        if delegate && grant.can_execute_only() {
            continue;
        }
        return Ok(Decision::Allow);
    }
    Ok(Decision::Deny)
}

/// May positive grants made to `group` apply to a target in `target_domain`
///
/// True when the target is not domained, when the grantee or the group lives in
/// the target's domain, or when the target's domain allows `crossDomainAdmin`
/// to the grantee's domain. Lookup failures count as not allowed.
pub fn cross_domain_ok(
    acls: &AclStore<'_>,
    grantee_domain: &Entry,
    target_domain: Option<&Entry>,
    group: &Entry,
) -> bool {
    let Some(target_domain) = target_domain else {
        return true;
    };
    if grantee_domain.id == target_domain.id {
        return true;
    }

    match acls.directory().domain_of(group) {
        Ok(Some(group_domain)) if group_domain.id == target_domain.id => return true,
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(group = %group.name, "group has no domain");
            return false;
        }
        Err(e) => {
            tracing::warn!(group = %group.name, error = %e, "unable to resolve group domain");
            return false;
        }
    }

    match check_cross_domain_admin_right(acls, grantee_domain, target_domain, false) {
        Ok(decision) => decision == Decision::Allow,
        Err(e) => {
            tracing::warn!(
                domain = %target_domain.name,
                error = %e,
                "unable to check crossDomainAdmin"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::grant::{Grant, RightModifier};
    use std::sync::Arc;
    use warden_core::{EntryId, EntryKind, RightCatalog, RightDefinition, CROSS_DOMAIN_ADMIN};

    struct Fixture {
        dir: MemoryDirectory,
        catalog: RightCatalog,
        home: Arc<Entry>,
        away: Arc<Entry>,
    }

    fn fixture() -> Fixture {
        let dir = MemoryDirectory::new();
        let home = dir.add_entry(Entry::new(
            EntryId::from_name("home.com"),
            "home.com",
            EntryKind::Domain,
        ));
        let away = dir.add_entry(Entry::new(
            EntryId::from_name("away.com"),
            "away.com",
            EntryKind::Domain,
        ));
        let mut builder = RightCatalog::builder();
        builder
            .define(&RightDefinition::preset(
                CROSS_DOMAIN_ADMIN,
                TargetType::Domain,
                false,
            ))
            .unwrap();
        Fixture {
            dir,
            catalog: builder.build(),
            home,
            away,
        }
    }

    fn grant_cross(f: &Fixture, grant: Grant) {
        AclStore::new(&f.dir, &f.catalog)
            .grant(&f.away, &[grant])
            .unwrap();
    }

    #[test]
    fn test_absent_grant_denies() {
        let f = fixture();
        let acls = AclStore::new(&f.dir, &f.catalog);
        assert_eq!(
            check_cross_domain_admin_right(&acls, &f.home, &f.away, false).unwrap(),
            Decision::Deny
        );
    }

    #[test]
    fn test_allow_and_execute_only() {
        let f = fixture();
        let right = f.catalog.lookup(CROSS_DOMAIN_ADMIN).unwrap();
        grant_cross(
            &f,
            Grant::allow(f.home.id.to_string(), GranteeType::Domain, right),
        );
        let acls = AclStore::new(&f.dir, &f.catalog);
        assert_eq!(
            check_cross_domain_admin_right(&acls, &f.home, &f.away, false).unwrap(),
            Decision::Allow
        );
        assert_eq!(
            check_cross_domain_admin_right(&acls, &f.home, &f.away, true).unwrap(),
            Decision::Deny
        );
    }

    #[test]
    fn test_delegable_grant_allows_delegation() {
        let f = fixture();
        let right = f.catalog.lookup(CROSS_DOMAIN_ADMIN).unwrap();
        grant_cross(
            &f,
            Grant::allow(f.home.id.to_string(), GranteeType::Domain, right)
                .with_modifier(Some(RightModifier::CanDelegate)),
        );
        let acls = AclStore::new(&f.dir, &f.catalog);
        assert_eq!(
            check_cross_domain_admin_right(&acls, &f.home, &f.away, true).unwrap(),
            Decision::Allow
        );
    }

    #[test]
    fn test_non_domain_target_is_invalid() {
        let f = fixture();
        let acls = AclStore::new(&f.dir, &f.catalog);
        let cos = f
            .dir
            .add_entry(Entry::new(EntryId::from_name("cos"), "default", EntryKind::Cos));
        assert!(matches!(
            check_cross_domain_admin_right(&acls, &f.home, &cos, false),
            Err(WardenError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_cross_domain_ok_rules() {
        let f = fixture();
        let acls = AclStore::new(&f.dir, &f.catalog);
        let home_group = f.dir.add_entry(
            Entry::new(
                EntryId::from_name("admins@home.com"),
                "admins@home.com",
                EntryKind::DistributionList { admin_group: true },
            )
            .in_domain(f.home.id),
        );
        let away_group = f.dir.add_entry(
            Entry::new(
                EntryId::from_name("admins@away.com"),
                "admins@away.com",
                EntryKind::DistributionList { admin_group: true },
            )
            .in_domain(f.away.id),
        );

        assert!(cross_domain_ok(&acls, &f.home, None, &home_group));
        assert!(cross_domain_ok(&acls, &f.home, Some(&f.home), &home_group));
        assert!(cross_domain_ok(&acls, &f.home, Some(&f.away), &away_group));
        assert!(!cross_domain_ok(&acls, &f.home, Some(&f.away), &home_group));

        let right = f.catalog.lookup(CROSS_DOMAIN_ADMIN).unwrap();
        grant_cross(
            &f,
            Grant::allow(f.home.id.to_string(), GranteeType::Domain, right),
        );
        let acls = AclStore::new(&f.dir, &f.catalog);
        assert!(cross_domain_ok(&acls, &f.home, Some(&f.away), &home_group));
    }
}
