//! Property test strategies for Warden types
//!
//! Strategies draw rights from [`standard_catalog`](crate::standard_catalog)
//! and only produce grants that pass grant-time validation.

use proptest::prelude::*;
use std::sync::Arc;

// Re-export proptest for convenience
pub use proptest;

use once_cell::sync::Lazy;
use warden_authorization::{ExternalGroupRef, Grant, RightModifier};
use warden_core::{EntryId, GranteeType, Right, RightCatalog};

/// Strategy for deterministic entry ids
///
/// # Example
///
/// ```rust
/// use warden_testkit::strategies::arb_entry_id;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_entry_id_property(id in arb_entry_id()) {
///         assert_ne!(id.to_string(), "");
///     }
/// }
/// ```
pub fn arb_entry_id() -> impl Strategy<Value = EntryId> {
    (0u64..10000).prop_map(|seed| EntryId::from_name(&format!("entry-{seed}")))
}

/// Strategy for secrets and guest names: no `:` and no leading or trailing space
pub fn arb_secret() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!#%&*_.-]{1,16}"
}

/// Strategy for guest display names, which may contain inner spaces
pub fn arb_guest_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._@-]{1,12}( [A-Za-z0-9._@-]{1,12}){0,2}"
}

/// Strategy for email-like identifiers
pub fn arb_email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,10}", "[a-z]{1,8}\\.(com|org|net)")
        .prop_map(|(local, domain)| format!("{local}@{domain}"))
}

/// Strategy for right modifiers, including none
pub fn arb_modifier() -> impl Strategy<Value = Option<RightModifier>> {
    prop_oneof![
        Just(None),
        Just(Some(RightModifier::Deny)),
        Just(Some(RightModifier::CanDelegate)),
    ]
}

static CATALOG: Lazy<Arc<RightCatalog>> = Lazy::new(crate::standard_catalog);

fn standard_right(name: &'static str) -> Arc<Right> {
    CATALOG
        .lookup(name)
        .expect("right is part of the fixture catalog")
}

/// Strategy for user rights of the standard catalog
pub fn arb_user_right() -> impl Strategy<Value = Arc<Right>> {
    prop_oneof![
        Just("sendAs"),
        Just("sendOnBehalfOf"),
        Just("viewFreeBusy"),
        Just("invite"),
    ]
    .prop_map(standard_right)
}

/// Strategy for admin rights of the standard catalog
pub fn arb_admin_right() -> impl Strategy<Value = Arc<Right>> {
    prop_oneof![
        Just("listAccount"),
        Just("deleteAccount"),
        Just("renameAccount"),
        Just("domainAdminAccountRights"),
    ]
    .prop_map(standard_right)
}

/// Strategy for grants of user rights covering every grantee type
///
/// # Example
///
/// ```rust
/// use warden_testkit::strategies::arb_user_grant;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_grant_validates(grant in arb_user_grant()) {
///         prop_assert!(grant.validate().is_ok());
///     }
/// }
/// ```
pub fn arb_user_grant() -> impl Strategy<Value = Grant> {
    let internal = prop_oneof![
        arb_entry_id().prop_map(|id| (id.to_string(), GranteeType::User, None::<String>)),
        arb_entry_id().prop_map(|id| (id.to_string(), GranteeType::Group, None::<String>)),
        arb_entry_id().prop_map(|id| (id.to_string(), GranteeType::Domain, None::<String>)),
        Just((String::new(), GranteeType::AuthUser, None::<String>)),
        Just((String::new(), GranteeType::Public, None::<String>)),
    ];
    let external = prop_oneof![
        "[a-z]{1,8}\\.(com|org)".prop_map(|d| (d, GranteeType::ExternalDomain, None::<String>)),
        arb_email().prop_map(|e| (e, GranteeType::Email, None::<String>)),
        (arb_guest_name(), proptest::option::of(arb_secret()))
            .prop_map(|(name, secret)| (name, GranteeType::Guest, secret)),
        (arb_email(), arb_secret()).prop_map(|(email, key)| (email, GranteeType::Key, Some(key))),
        (arb_entry_id(), arb_email()).prop_map(|(domain, email)| {
            let group = ExternalGroupRef {
                domain_id: domain.to_string(),
                group_email: email,
            };
            (group.to_string(), GranteeType::ExternalGroup, None::<String>)
        }),
    ];
    (prop_oneof![internal, external], arb_user_right(), arb_modifier()).prop_map(
        |((grantee, grantee_type, secret), right, modifier)| {
            Grant::new(grantee, grantee_type, right, modifier, secret)
        },
    )
}

/// Strategy for grants of admin rights to users and groups
pub fn arb_admin_grant() -> impl Strategy<Value = Grant> {
    (
        arb_entry_id(),
        prop_oneof![Just(GranteeType::User), Just(GranteeType::Group)],
        arb_admin_right(),
        arb_modifier(),
    )
        .prop_map(|(id, grantee_type, right, modifier)| {
            Grant::new(id.to_string(), grantee_type, right, modifier, None)
        })
}

/// Strategy for any valid grant
pub fn arb_grant() -> impl Strategy<Value = Grant> {
    prop_oneof![3 => arb_user_grant(), 1 => arb_admin_grant()]
}
