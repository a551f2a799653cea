//! Grantee types and their capability flags
//!
//! A grantee type is pure data: a wire code plus a [`GranteeFlags`] set. How a
//! principal is matched against a grantee lives in the resolver, not here.

use crate::errors::{WardenError, WardenResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo id stored for "all authenticated users" grants
pub const GUID_AUTHUSER: &str = "00000000-0000-0000-0000-000000000000";

/// Pseudo id stored for public grants
pub const GUID_PUBLIC: &str = "99999999-9999-9999-9999-999999999999";

bitflags! {
    /// Capability set carried by each grantee type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct GranteeFlags: u16 {
        /// May receive admin rights
        const ADMIN = 1 << 0;
        /// Matches a single principal
        const INDIVIDUAL = 1 << 1;
        /// Matches through group membership
        const GROUP = 1 << 2;
        /// Matches every account of a domain
        const DOMAIN = 1 << 3;
        /// Matches every authenticated account
        const AUTH_USER = 1 << 4;
        /// Matches anyone, including anonymous callers
        const PUBLIC = 1 << 5;
        /// Grantee id names a directory entry
        const ZIMBRA_ENTRY = 1 << 6;
        /// Grant carries a password or access key
        const HAS_SECRET = 1 << 7;
    }
}

/// Kind of principal a grant is made to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GranteeType {
    /// Internal account (`usr`)
    User,
    /// Internal group (`grp`)
    Group,
    /// External group (`egp`)
    ExternalGroup,
    /// Every authenticated account (`all`)
    AuthUser,
    /// Internal domain (`dom`)
    Domain,
    /// External domain name (`edom`)
    ExternalDomain,
    /// Password-bearing guest (`gst`)
    Guest,
    /// Access-key holder (`key`)
    Key,
    /// Anyone (`pub`)
    Public,
    /// Email address (`email`)
    Email,
}

impl GranteeType {
    /// Every grantee type
    pub const ALL: [GranteeType; 10] = [
        GranteeType::User,
        GranteeType::Group,
        GranteeType::ExternalGroup,
        GranteeType::AuthUser,
        GranteeType::Domain,
        GranteeType::ExternalDomain,
        GranteeType::Guest,
        GranteeType::Key,
        GranteeType::Public,
        GranteeType::Email,
    ];

    /// Code stored in the ACE wire format
    pub fn code(self) -> &'static str {
        match self {
            GranteeType::User => "usr",
            GranteeType::Group => "grp",
            GranteeType::ExternalGroup => "egp",
            GranteeType::AuthUser => "all",
            GranteeType::Domain => "dom",
            GranteeType::ExternalDomain => "edom",
            GranteeType::Guest => "gst",
            GranteeType::Key => "key",
            GranteeType::Public => "pub",
            GranteeType::Email => "email",
        }
    }

    /// Parse a wire code
    pub fn from_code(code: &str) -> WardenResult<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or_else(|| WardenError::parse(format!("invalid grantee type: {code}")))
    }

    /// Capability flags of this grantee type
    pub fn flags(self) -> GranteeFlags {
        match self {
            GranteeType::User => {
                GranteeFlags::ADMIN | GranteeFlags::INDIVIDUAL | GranteeFlags::ZIMBRA_ENTRY
            }
            GranteeType::Group => {
                GranteeFlags::ADMIN | GranteeFlags::GROUP | GranteeFlags::ZIMBRA_ENTRY
            }
            GranteeType::ExternalGroup => GranteeFlags::ADMIN | GranteeFlags::GROUP,
            GranteeType::AuthUser => GranteeFlags::AUTH_USER,
            GranteeType::Domain => {
                GranteeFlags::ADMIN | GranteeFlags::DOMAIN | GranteeFlags::ZIMBRA_ENTRY
            }
            GranteeType::ExternalDomain => GranteeFlags::INDIVIDUAL,
            GranteeType::Guest => GranteeFlags::INDIVIDUAL | GranteeFlags::HAS_SECRET,
            GranteeType::Key => GranteeFlags::INDIVIDUAL | GranteeFlags::HAS_SECRET,
            GranteeType::Public => GranteeFlags::PUBLIC,
            GranteeType::Email => GranteeFlags::INDIVIDUAL,
        }
    }

    /// True when every flag in `flags` is set on this type
    pub fn has_flags(self, flags: GranteeFlags) -> bool {
        self.flags().contains(flags)
    }

    /// May this grantee type receive admin rights
    pub fn allowed_for_admin_rights(self) -> bool {
        self.has_flags(GranteeFlags::ADMIN)
    }

    /// Grants to this type carry a secret
    pub fn has_secret(self) -> bool {
        self.has_flags(GranteeFlags::HAS_SECRET)
    }

    /// Grantee id refers to a directory entry
    pub fn is_zimbra_entry(self) -> bool {
        self.has_flags(GranteeFlags::ZIMBRA_ENTRY)
    }

    /// Grantee id must be a directory UUID on the wire
    pub fn requires_uuid(self) -> bool {
        matches!(
            self,
            GranteeType::User
                | GranteeType::Group
                | GranteeType::Domain
                | GranteeType::AuthUser
                | GranteeType::Public
        )
    }

    /// Whether a grant to this type names a specific grantee
    pub fn needs_grantee_identity(self) -> bool {
        !matches!(self, GranteeType::AuthUser | GranteeType::Public)
    }

    /// Fixed grantee id for pseudo grantee types
    pub fn pseudo_id(self) -> Option<&'static str> {
        match self {
            GranteeType::AuthUser => Some(GUID_AUTHUSER),
            GranteeType::Public => Some(GUID_PUBLIC),
            _ => None,
        }
    }
}

impl fmt::Display for GranteeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_eligibility() {
        let eligible: Vec<_> = GranteeType::ALL
            .into_iter()
            .filter(|g| g.allowed_for_admin_rights())
            .collect();
        assert_eq!(
            eligible,
            vec![
                GranteeType::User,
                GranteeType::Group,
                GranteeType::ExternalGroup,
                GranteeType::Domain
            ]
        );
    }

    #[test]
    fn test_has_flags_requires_all() {
        let individual_admin = GranteeFlags::INDIVIDUAL | GranteeFlags::ADMIN;
        assert!(GranteeType::User.has_flags(individual_admin));
        assert!(!GranteeType::Guest.has_flags(individual_admin));
        assert!(GranteeType::Guest.has_flags(GranteeFlags::INDIVIDUAL));
    }

    #[test]
    fn test_unknown_code_is_parse_error() {
        assert!(matches!(
            GranteeType::from_code("usx"),
            Err(WardenError::Parse { .. })
        ));
        assert_eq!(GranteeType::from_code("edom").ok(), Some(GranteeType::ExternalDomain));
    }

    #[test]
    fn test_pseudo_grantees() {
        assert!(!GranteeType::Public.needs_grantee_identity());
        assert_eq!(GranteeType::AuthUser.pseudo_id(), Some(GUID_AUTHUSER));
        assert_eq!(GranteeType::User.pseudo_id(), None);
    }
}
