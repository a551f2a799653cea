//! Warden Core - authorization vocabulary
//!
//! Leaf types shared by every Warden crate:
//!
//! - [`TargetType`]: entry kinds and the grant inheritance table
//! - [`GranteeType`] / [`GranteeFlags`]: who a grant can be made to
//! - [`Right`] / [`RightCatalog`]: the immutable right taxonomy
//! - [`Entry`] / [`Principal`]: the directory objects being checked
//! - [`WardenError`]: the single error type
//! - [`CheckerConfig`]: layered configuration

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Target types and inheritance
pub mod target;

/// Grantee types and capability flags
pub mod grantee;

/// Directory entries and principals
pub mod entry;

/// Right taxonomy and catalog
pub mod right;

/// Configuration loading
pub mod config;

pub use config::{CheckerConfig, ConfigLoad};
pub use entry::{AdminFlags, Entry, EntryId, EntryKind, GuestCredentials, Principal, PseudoDomain};
pub use errors::{DenialReason, WardenError, WardenResult};
pub use grantee::{GranteeFlags, GranteeType, GUID_AUTHUSER, GUID_PUBLIC};
pub use right::{
    AttrScope, Right, RightCatalog, RightDefault, RightDefinition, RightDefinitions, RightKind,
    CROSS_DOMAIN_ADMIN,
};
pub use target::TargetType;
