//! Single access-control entries and their wire encoding
//!
//! An ACE is stored as one line:
//!
//! ```text
//! <grantee> <grantee-type-code> [modifier-char]<right-name>
//! ```
//!
//! The grantee is everything before the second-to-last space and the right is
//! everything after the last space, because guest and external-group grantees
//! may themselves contain spaces.

use crate::errors::{WardenError, WardenResult};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::{GranteeType, Right, RightCatalog, TargetType};

/// Modifier prefixed to the right name on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RightModifier {
    /// Negative grant
    Deny,
    /// Holder may re-grant the right
    CanDelegate,
    /// Domain grant applies to sub-domains rather than the domain itself
    SubDomain,
    /// Group grant is not inherited by members of nested groups
    DisinheritSubGroups,
}

impl RightModifier {
    /// Wire character
    pub fn as_char(self) -> char {
        match self {
            RightModifier::Deny => '-',
            RightModifier::CanDelegate => '+',
            RightModifier::SubDomain => '*',
            RightModifier::DisinheritSubGroups => '^',
        }
    }

    /// Parse a wire character
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(RightModifier::Deny),
            '+' => Some(RightModifier::CanDelegate),
            '*' => Some(RightModifier::SubDomain),
            '^' => Some(RightModifier::DisinheritSubGroups),
            _ => None,
        }
    }
}

/// Where a grant was loaded from; diagnostic only and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOrigin {
    /// Type of the entry the grant is stored on
    pub target_type: TargetType,
    /// Name of the entry the grant is stored on
    pub target_name: String,
}

/// Parsed `egp` grantee: `<domain-id>:<external-group-email>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalGroupRef {
    /// Id of the internal domain whose external source holds the group
    pub domain_id: String,
    /// Email of the group in the external directory
    pub group_email: String,
}

impl ExternalGroupRef {
    /// Split an `egp` grantee id
    pub fn parse(grantee: &str) -> WardenResult<Self> {
        let parts: Vec<&str> = grantee.split(':').collect();
        match parts.as_slice() {
            [domain_id, group_email] if !domain_id.is_empty() && !group_email.is_empty() => {
                Ok(Self {
                    domain_id: (*domain_id).to_string(),
                    group_email: (*group_email).to_string(),
                })
            }
            _ => Err(WardenError::parse(format!(
                "invalid external group grantee: {grantee}"
            ))),
        }
    }
}

impl fmt::Display for ExternalGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain_id, self.group_email)
    }
}

/// One authorization record
#[derive(Debug, Clone)]
pub struct Grant {
    grantee: String,
    grantee_type: GranteeType,
    right: Arc<Right>,
    modifier: Option<RightModifier>,
    secret: Option<String>,
    origin: Option<GrantOrigin>,
}

impl Grant {
    /// Build a grant; pseudo grantee types get their fixed ids
    ///
    /// Parsed grants keep whatever id was stored, see [`Grant::parse`].
    pub fn new(
        grantee: impl Into<String>,
        grantee_type: GranteeType,
        right: Arc<Right>,
        modifier: Option<RightModifier>,
        secret: Option<String>,
    ) -> Self {
        let grantee = match grantee_type.pseudo_id() {
            Some(pseudo) => pseudo.to_string(),
            None => grantee.into(),
        };
        Self {
            grantee,
            grantee_type,
            right,
            modifier,
            secret,
            origin: None,
        }
    }

    /// Positive grant with no modifier
    pub fn allow(grantee: impl Into<String>, grantee_type: GranteeType, right: Arc<Right>) -> Self {
        Self::new(grantee, grantee_type, right, None, None)
    }

    /// Negative grant
    pub fn deny(grantee: impl Into<String>, grantee_type: GranteeType, right: Arc<Right>) -> Self {
        Self::new(
            grantee,
            grantee_type,
            right,
            Some(RightModifier::Deny),
            None,
        )
    }

    /// Replace the modifier
    pub fn with_modifier(mut self, modifier: Option<RightModifier>) -> Self {
        self.modifier = modifier;
        self
    }

    /// Replace the secret
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret;
        self
    }

    pub(crate) fn with_origin(mut self, origin: GrantOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Grantee id as stored
    pub fn grantee(&self) -> &str {
        &self.grantee
    }

    /// Grantee type
    pub fn grantee_type(&self) -> GranteeType {
        self.grantee_type
    }

    /// Granted right
    pub fn right(&self) -> &Arc<Right> {
        &self.right
    }

    /// Modifier, if any
    pub fn modifier(&self) -> Option<RightModifier> {
        self.modifier
    }

    /// Guest password or access key
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Entry this grant was loaded from
    pub fn origin(&self) -> Option<&GrantOrigin> {
        self.origin.as_ref()
    }

    /// Negative grant
    pub fn is_deny(&self) -> bool {
        self.modifier == Some(RightModifier::Deny)
    }

    /// Holder may re-grant
    pub fn can_delegate(&self) -> bool {
        self.modifier == Some(RightModifier::CanDelegate)
    }

    /// Applies to sub-domains
    pub fn sub_domain(&self) -> bool {
        self.modifier == Some(RightModifier::SubDomain)
    }

    /// Not inherited through nested groups
    pub fn disinherit_sub_groups(&self) -> bool {
        self.modifier == Some(RightModifier::DisinheritSubGroups)
    }

    /// Positive grant that may only be executed, not delegated
    pub fn can_execute_only(&self) -> bool {
        !self.can_delegate() && !self.is_deny()
    }

    /// Identity used to detect re-grants: grantee, grantee type and right
    pub(crate) fn same_slot(&self, other: &Grant) -> bool {
        self.grantee == other.grantee
            && self.grantee_type == other.grantee_type
            && self.right.name() == other.right.name()
    }

    /// Identity used to match revocations: slot plus modifier
    pub(crate) fn same_identity(&self, other: &Grant) -> bool {
        self.same_slot(other) && self.modifier == other.modifier
    }

    /// Grant-time validation
    ///
    /// Rejects values that would corrupt the wire encoding and grantee/right
    /// combinations that can never be effective.
    pub fn validate(&self) -> WardenResult<()> {
        let right_name = self.right.name();

        if self.grantee_type.has_secret() {
            if self.grantee.contains(':') {
                return Err(WardenError::invalid_request(format!(
                    "grantee name cannot contain ':': {}",
                    self.grantee
                )));
            }
            if self.secret.as_deref().is_some_and(|s| s.contains(':')) {
                return Err(WardenError::invalid_request("password cannot contain ':'"));
            }
        } else if self.secret.is_some() {
            return Err(WardenError::invalid_request(format!(
                "grantee type {} cannot carry a secret",
                self.grantee_type
            )));
        }

        if self.grantee.contains(' ') && self.grantee_type.requires_uuid() {
            return Err(WardenError::invalid_request(format!(
                "grantee id cannot contain spaces: {}",
                self.grantee
            )));
        }

        if self.grantee_type == GranteeType::ExternalGroup {
            ExternalGroupRef::parse(&self.grantee).map_err(|e| {
                WardenError::invalid_request(e.to_string())
            })?;
        }

        if !self.right.is_user_right() && !self.grantee_type.allowed_for_admin_rights() {
            return Err(WardenError::invalid_request(format!(
                "grantee type {} is not allowed for admin right {right_name}",
                self.grantee_type
            )));
        }

        if self.right.is_cross_domain_admin() && self.grantee_type != GranteeType::Domain {
            return Err(WardenError::invalid_request(format!(
                "{right_name} can only be granted to a domain"
            )));
        }

        match self.modifier {
            Some(RightModifier::SubDomain) if !self.right.allows_sub_domain_modifier() => {
                Err(WardenError::invalid_request(format!(
                    "sub domain modifier is not allowed for right {right_name}"
                )))
            }
            Some(RightModifier::DisinheritSubGroups)
                if !self.right.allows_disinherit_sub_groups_modifier() =>
            {
                Err(WardenError::invalid_request(format!(
                    "disinherit sub groups modifier is not allowed for right {right_name}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Parse one ACE line
    ///
    /// Any malformed field, including an unknown right, is a parse error.
    pub fn parse(ace: &str, catalog: &RightCatalog) -> WardenResult<Self> {
        let malformed = || WardenError::parse(format!("bad ACE: {ace}"));

        let last = ace.rfind(' ').ok_or_else(malformed)?;
        let second = ace[..last].rfind(' ').ok_or_else(malformed)?;

        let grantee_field = &ace[..second];
        let type_code = &ace[second + 1..last];
        let right_field = &ace[last + 1..];
        if grantee_field.is_empty() || right_field.is_empty() {
            return Err(malformed());
        }

        let grantee_type = GranteeType::from_code(type_code)?;

        let (grantee, secret) = if grantee_type.has_secret() {
            // Trailing empty parts are dropped; an empty name is allowed.
            let mut parts: Vec<&str> = grantee_field.split(':').collect();
            while parts.last() == Some(&"") {
                parts.pop();
            }
            match parts.as_slice() {
                [name] => (name.to_string(), None),
                [name, secret] => (name.to_string(), Some(secret.to_string())),
                _ => return Err(malformed()),
            }
        } else {
            if grantee_type.requires_uuid() && Uuid::parse_str(grantee_field).is_err() {
                return Err(WardenError::parse(format!(
                    "grantee {grantee_field} of type {grantee_type} is not a valid id: {ace}"
                )));
            }
            (grantee_field.to_string(), None)
        };

        let mut chars = right_field.chars();
        let (modifier, right_name) = match chars.next().and_then(RightModifier::from_char) {
            Some(modifier) => (Some(modifier), chars.as_str()),
            None => (None, right_field),
        };
        let right = catalog
            .lookup(right_name)
            .map_err(|e| WardenError::parse(format!("{e} in ACE: {ace}")))?;

        // Stored ids are kept as written so the grant serializes back to its ACE.
        Ok(Self {
            grantee,
            grantee_type,
            right,
            modifier,
            secret,
            origin: None,
        })
    }

    /// Wire encoding of this grant
    pub fn serialize(&self) -> String {
        let grantee = if self.grantee_type.has_secret() {
            format!("{}:{}", self.grantee, self.secret.as_deref().unwrap_or(""))
        } else {
            self.grantee.clone()
        };
        let modifier = self
            .modifier
            .map(|m| m.as_char().to_string())
            .unwrap_or_default();
        format!(
            "{grantee} {} {modifier}{}",
            self.grantee_type.code(),
            self.right.name()
        )
    }
}

impl PartialEq for Grant {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other) && self.secret == other.secret
    }
}

impl Eq for Grant {}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{RightDefinition, GUID_PUBLIC};

    fn catalog() -> RightCatalog {
        let mut builder = RightCatalog::builder();
        for def in [
            RightDefinition::preset("viewFreeBusy", TargetType::Account, true),
            RightDefinition::preset("sendAs", TargetType::Account, true),
            RightDefinition::preset("createAccount", TargetType::Domain, false),
            RightDefinition::preset("crossDomainAdmin", TargetType::Domain, false),
        ] {
            builder.define(&def).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_parse_deny_group_grant() {
        let catalog = catalog();
        let grant = Grant::parse(
            "fe0e1a88-e6e3-4fe1-b608-3ab6ce50351f grp -viewFreeBusy",
            &catalog,
        )
        .unwrap();
        assert_eq!(grant.grantee_type(), GranteeType::Group);
        assert!(grant.is_deny());
        assert!(!grant.can_execute_only());
        assert_eq!(grant.right().name(), "viewFreeBusy");
    }

    #[test]
    fn test_guest_grantee_with_spaces_and_secret() {
        let catalog = catalog();
        let grant = Grant::parse("Jane Doe:s3cret gst viewFreeBusy", &catalog).unwrap();
        assert_eq!(grant.grantee(), "Jane Doe");
        assert_eq!(grant.secret(), Some("s3cret"));
        assert_eq!(grant.serialize(), "Jane Doe:s3cret gst viewFreeBusy");

        let no_secret = Grant::parse("jane@other.org: key +viewFreeBusy", &catalog).unwrap();
        assert_eq!(no_secret.secret(), None);
        assert!(no_secret.can_delegate());
        assert_eq!(no_secret.serialize(), "jane@other.org: key +viewFreeBusy");
    }

    #[test]
    fn test_pseudo_grantees_normalized() {
        let catalog = catalog();
        let right = catalog.lookup("viewFreeBusy").unwrap();
        let grant = Grant::allow("whatever", GranteeType::Public, right);
        assert_eq!(grant.grantee(), GUID_PUBLIC);
        assert_eq!(
            grant.serialize(),
            format!("{GUID_PUBLIC} pub viewFreeBusy")
        );
    }

    #[test]
    fn test_stored_pseudo_grantee_id_kept() {
        let catalog = catalog();
        let stored = "11111111-2222-3333-4444-555555555555 pub viewFreeBusy";
        let grant = Grant::parse(stored, &catalog).unwrap();
        assert_eq!(grant.grantee(), "11111111-2222-3333-4444-555555555555");
        assert_eq!(grant.serialize(), stored);

        let mut set = crate::grant_set::GrantSet::from_grants([grant]);
        let revoked = set.revoke(&[Grant::parse(stored, &catalog).unwrap()]);
        assert_eq!(revoked.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_guest_grantee_may_be_unnamed() {
        let catalog = catalog();
        let grant = Grant::parse(":s3cret gst viewFreeBusy", &catalog).unwrap();
        assert_eq!(grant.grantee(), "");
        assert_eq!(grant.secret(), Some("s3cret"));
        assert_eq!(grant.serialize(), ":s3cret gst viewFreeBusy");

        let trailing = Grant::parse("jane@other.org:s3cret: gst viewFreeBusy", &catalog).unwrap();
        assert_eq!(trailing.secret(), Some("s3cret"));
    }

    #[test]
    fn test_parse_errors() {
        let catalog = catalog();
        for bad in [
            "onlyone",
            "two fields",
            "fe0e1a88-e6e3-4fe1-b608-3ab6ce50351f zzz viewFreeBusy",
            "not-a-uuid usr viewFreeBusy",
            "fe0e1a88-e6e3-4fe1-b608-3ab6ce50351f usr noSuchRight",
            "a:b:c gst viewFreeBusy",
            ": gst viewFreeBusy",
            " usr viewFreeBusy",
        ] {
            assert!(
                matches!(Grant::parse(bad, &catalog), Err(WardenError::Parse { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_separator_in_secret() {
        let catalog = catalog();
        let right = catalog.lookup("viewFreeBusy").unwrap();
        let grant = Grant::new(
            "guest@other.org",
            GranteeType::Guest,
            right.clone(),
            None,
            Some("pa:ss".into()),
        );
        assert!(matches!(
            grant.validate(),
            Err(WardenError::InvalidRequest { .. })
        ));

        let grant = Grant::new("a:b", GranteeType::Key, right, None, None);
        assert!(grant.validate().is_err());
    }

    #[test]
    fn test_validate_admin_grantee_types() {
        let catalog = catalog();
        let create = catalog.lookup("createAccount").unwrap();
        let id = Uuid::new_v4().to_string();
        assert!(Grant::allow(&id, GranteeType::User, create.clone())
            .validate()
            .is_ok());
        assert!(Grant::allow("", GranteeType::AuthUser, create.clone())
            .validate()
            .is_err());

        let cross = catalog.lookup("crossDomainAdmin").unwrap();
        assert!(Grant::allow(&id, GranteeType::User, cross.clone())
            .validate()
            .is_err());
        assert!(Grant::allow(&id, GranteeType::Domain, cross).validate().is_ok());
    }

    #[test]
    fn test_validate_modifiers() {
        let catalog = catalog();
        let id = Uuid::new_v4().to_string();
        let create = catalog.lookup("createAccount").unwrap();
        let send_as = catalog.lookup("sendAs").unwrap();

        let sub = Grant::allow(&id, GranteeType::User, create.clone())
            .with_modifier(Some(RightModifier::SubDomain));
        assert!(sub.validate().is_ok());

        let bad_sub = Grant::allow(&id, GranteeType::User, send_as.clone())
            .with_modifier(Some(RightModifier::SubDomain));
        assert!(bad_sub.validate().is_err());

        let disinherit = Grant::allow(&id, GranteeType::User, send_as)
            .with_modifier(Some(RightModifier::DisinheritSubGroups));
        assert!(disinherit.validate().is_ok());
    }

    #[test]
    fn test_external_group_ref() {
        let parsed = ExternalGroupRef::parse("dom-id:eng@corp.example").unwrap();
        assert_eq!(parsed.domain_id, "dom-id");
        assert_eq!(parsed.group_email, "eng@corp.example");
        assert_eq!(parsed.to_string(), "dom-id:eng@corp.example");
        assert!(ExternalGroupRef::parse("nodomain").is_err());
        assert!(ExternalGroupRef::parse("a:b:c").is_err());
    }

    #[test]
    fn test_modifier_chars_round_trip() {
        for m in [
            RightModifier::Deny,
            RightModifier::CanDelegate,
            RightModifier::SubDomain,
            RightModifier::DisinheritSubGroups,
        ] {
            assert_eq!(RightModifier::from_char(m.as_char()), Some(m));
        }
        assert_eq!(RightModifier::from_char('v'), None);
    }
}
