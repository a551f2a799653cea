//! Grant storage and right checking for Warden
//!
//! This crate answers "may this principal exercise this right on this entry"
//! from the grants stored on directory entries.
//!
//! # Architecture
//!
//! - **Grants**: [`Grant`] and [`GrantSet`], with the ACE wire encoding
//! - **Storage**: [`AclStore`] over the [`Directory`] contract
//! - **Resolution**: [`GranteeResolver`] and the [`ancestors_of`] chain
//! - **Checking**: [`RightChecker`], [`HardRules`] and cross-domain rules
//! - **Caching**: the [`PermissionCache`] contract and [`MemoryPermissionCache`]

#![forbid(unsafe_code)]

// Core modules
pub mod decision;
pub mod errors;
pub mod grant;
pub mod grant_set;

// Storage
pub mod acl;
pub mod cache;
pub mod directory;

// Evaluation
pub mod checker;
pub mod cross_domain;
pub mod hard_rules;
pub mod hierarchy;
pub mod resolver;

// Share policy
pub mod expiry;

// Re-exports
pub use acl::{AclStore, ACE_ATTR};
pub use cache::{CachedPermission, MemoryPermissionCache, PermissionCache};
pub use checker::{CheckRequest, RightChecker};
pub use cross_domain::{check_cross_domain_admin_right, cross_domain_ok};
pub use decision::{Decision, Evaluation, ViaGrant};
pub use directory::{Directory, GroupMembership, MemberOf, MemoryDirectory};
pub use errors::{DenialReason, WardenError, WardenResult};
pub use expiry::{validate_grant_expiry, validate_grant_expiry_now};
pub use grant::{ExternalGroupRef, Grant, GrantOrigin, RightModifier};
pub use grant_set::GrantSet;
pub use hard_rules::HardRules;
pub use hierarchy::{ancestors_of, Ancestor, Ancestors};
pub use resolver::{specificity_tiers, GranteeResolver, Tier};
