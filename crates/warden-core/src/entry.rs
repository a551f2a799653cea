//! Directory entries and principals
//!
//! [`Entry`] is the minimal view of a directory object the authorization core
//! needs: identity, name, kind and owning domain. [`Principal`] is whoever is
//! asking, which may be a directory entry, an unauthenticated guest or nobody.

use crate::target::TargetType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Directory-assigned identifier of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id derived from a name, for fixtures
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Admin flags of an account or calendar resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFlags {
    /// Global administrator
    pub global_admin: bool,
    /// Delegated (domain-scoped) administrator
    pub delegated_admin: bool,
}

/// Kind of directory entry, with the per-kind flags authorization reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// User account
    Account(AdminFlags),
    /// Calendar resource
    CalResource(AdminFlags),
    /// Static distribution list
    DistributionList {
        /// Group is eligible to carry admin rights
        admin_group: bool,
    },
    /// Dynamic group
    DynamicGroup {
        /// Group is eligible to carry admin rights
        admin_group: bool,
    },
    /// Mail domain
    Domain,
    /// Class of service
    Cos,
    /// Server
    Server,
    /// Unified communications service
    UcService,
    /// XMPP component
    XmppComponent,
    /// Zimlet
    Zimlet,
    /// Global configuration
    Config,
    /// Synthetic global grant entry
    GlobalGrant,
}

/// Parent domain of a pseudo target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoDomain {
    /// The pseudo entry lives in a domain that already exists
    Existing,
    /// The domain itself does not exist yet; it carries no grants
    Synthetic(Arc<Entry>),
}

/// Minimal view of a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Directory id
    pub id: EntryId,
    /// Email address, domain name or plain name depending on kind
    pub name: String,
    /// Entry kind and flags
    pub kind: EntryKind,
    /// Owning domain for domained kinds
    pub domain_id: Option<EntryId>,
    /// Set for entries synthesized before they exist in the directory
    pub pseudo: Option<PseudoDomain>,
}

impl Entry {
    /// Build a live entry
    pub fn new(id: EntryId, name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            domain_id: None,
            pseudo: None,
        }
    }

    /// Attach the owning domain
    pub fn in_domain(mut self, domain_id: EntryId) -> Self {
        self.domain_id = Some(domain_id);
        self
    }

    /// Mark as a pseudo target
    pub fn as_pseudo(mut self, domain: PseudoDomain) -> Self {
        self.pseudo = Some(domain);
        self
    }

    /// Target type of this entry
    pub fn target_type(&self) -> TargetType {
        match self.kind {
            EntryKind::Account(_) => TargetType::Account,
            EntryKind::CalResource(_) => TargetType::CalResource,
            EntryKind::DistributionList { .. } => TargetType::DistributionList,
            EntryKind::DynamicGroup { .. } => TargetType::Group,
            EntryKind::Domain => TargetType::Domain,
            EntryKind::Cos => TargetType::Cos,
            EntryKind::Server => TargetType::Server,
            EntryKind::UcService => TargetType::UcService,
            EntryKind::XmppComponent => TargetType::XmppComponent,
            EntryKind::Zimlet => TargetType::Zimlet,
            EntryKind::Config => TargetType::Config,
            EntryKind::GlobalGrant => TargetType::Global,
        }
    }

    /// Admin flags for accounts and calendar resources
    pub fn admin_flags(&self) -> Option<AdminFlags> {
        match self.kind {
            EntryKind::Account(flags) | EntryKind::CalResource(flags) => Some(flags),
            _ => None,
        }
    }

    /// Account or calendar resource
    pub fn is_account(&self) -> bool {
        self.admin_flags().is_some()
    }

    /// Account flagged as global administrator
    pub fn is_global_admin(&self) -> bool {
        self.admin_flags().is_some_and(|f| f.global_admin)
    }

    /// Account flagged as delegated administrator
    pub fn is_delegated_admin(&self) -> bool {
        self.admin_flags().is_some_and(|f| f.delegated_admin)
    }

    /// Distribution list or dynamic group
    pub fn is_group(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::DistributionList { .. } | EntryKind::DynamicGroup { .. }
        )
    }

    /// Group flagged as admin group
    pub fn is_admin_group(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::DistributionList { admin_group: true }
                | EntryKind::DynamicGroup { admin_group: true }
        )
    }

    /// Entry is synthesized and not yet in the directory
    pub fn is_pseudo(&self) -> bool {
        self.pseudo.is_some()
    }

    /// Domain part of the entry's name
    ///
    /// For domains this is the name itself; for addresses it is the part
    /// after the last `@`.
    pub fn domain_name(&self) -> Option<&str> {
        match self.kind {
            EntryKind::Domain => Some(self.name.as_str()),
            _ => self.name.rsplit_once('@').map(|(_, domain)| domain),
        }
    }
}

/// Credentials presented by an unauthenticated guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCredentials {
    /// Email the guest identifies as
    pub email: String,
    /// Password, when authenticating as a `gst` grantee
    pub password: Option<String>,
    /// Access key, when authenticating as a `key` grantee
    pub access_key: Option<String>,
}

impl GuestCredentials {
    /// Password guest
    pub fn with_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Some(password.into()),
            access_key: None,
        }
    }

    /// Access-key guest
    pub fn with_access_key(email: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: None,
            access_key: Some(key.into()),
        }
    }

    /// Matches a `gst` grantee and its secret
    pub fn matches(&self, grantee: &str, secret: Option<&str>) -> bool {
        self.email.eq_ignore_ascii_case(grantee) && self.password.as_deref() == secret
    }

    /// Matches a `key` grantee and its access key
    pub fn matches_access_key(&self, grantee: &str, key: Option<&str>) -> bool {
        self.email.eq_ignore_ascii_case(grantee)
            && key.is_some()
            && self.access_key.as_deref() == key
    }

    /// Domain part of the guest's email
    pub fn domain_name(&self) -> Option<&str> {
        self.email.rsplit_once('@').map(|(_, domain)| domain)
    }
}

/// Whoever is asking for a right
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Authenticated directory entry: account, calendar resource or group
    Entry(Arc<Entry>),
    /// Unauthenticated guest presenting credentials
    Guest(GuestCredentials),
    /// No identity at all
    Anonymous,
}

impl Principal {
    /// Directory entry behind this principal
    pub fn entry(&self) -> Option<&Arc<Entry>> {
        match self {
            Principal::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Directory id of this principal
    pub fn id(&self) -> Option<EntryId> {
        self.entry().map(|e| e.id)
    }

    /// Owning domain id of this principal
    pub fn domain_id(&self) -> Option<EntryId> {
        self.entry().and_then(|e| e.domain_id)
    }

    /// Domain name of this principal
    pub fn domain_name(&self) -> Option<&str> {
        match self {
            Principal::Entry(entry) => entry.domain_name(),
            Principal::Guest(guest) => guest.domain_name(),
            Principal::Anonymous => None,
        }
    }

    /// Authenticated account or calendar resource
    pub fn is_authenticated_account(&self) -> bool {
        self.entry().is_some_and(|e| e.is_account())
    }

    /// Global admin account
    pub fn is_global_admin(&self) -> bool {
        self.entry().is_some_and(|e| e.is_global_admin())
    }

    /// Delegated admin account
    pub fn is_delegated_admin(&self) -> bool {
        self.entry().is_some_and(|e| e.is_delegated_admin())
    }

    /// Whether grants of admin rights to this principal are still effective
    ///
    /// Accounts must carry an admin flag; groups must be admin groups.
    pub fn is_valid_admin_grantee(&self) -> bool {
        match self.entry() {
            Some(entry) if entry.is_account() => {
                entry.is_delegated_admin() || entry.is_global_admin()
            }
            Some(entry) => entry.is_admin_group(),
            None => false,
        }
    }

    /// Display name for logs
    pub fn display_name(&self) -> &str {
        match self {
            Principal::Entry(entry) => &entry.name,
            Principal::Guest(guest) => &guest.email,
            Principal::Anonymous => "anonymous",
        }
    }
}

impl From<Arc<Entry>> for Principal {
    fn from(entry: Arc<Entry>) -> Self {
        Principal::Entry(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, flags: AdminFlags) -> Arc<Entry> {
        Arc::new(Entry::new(
            EntryId::from_name(name),
            name,
            EntryKind::Account(flags),
        ))
    }

    #[test]
    fn test_domain_name_from_address() {
        let user = account("alice@example.com", AdminFlags::default());
        assert_eq!(user.domain_name(), Some("example.com"));
        let domain = Entry::new(EntryId::new(), "example.com", EntryKind::Domain);
        assert_eq!(domain.domain_name(), Some("example.com"));
    }

    #[test]
    fn test_admin_grantee_validity() {
        let plain = Principal::Entry(account("bob@example.com", AdminFlags::default()));
        assert!(!plain.is_valid_admin_grantee());

        let delegated = Principal::Entry(account(
            "carol@example.com",
            AdminFlags {
                delegated_admin: true,
                ..AdminFlags::default()
            },
        ));
        assert!(delegated.is_valid_admin_grantee());

        let group = Principal::Entry(Arc::new(Entry::new(
            EntryId::new(),
            "admins@example.com",
            EntryKind::DistributionList { admin_group: true },
        )));
        assert!(group.is_valid_admin_grantee());
        assert!(!Principal::Anonymous.is_valid_admin_grantee());
    }

    #[test]
    fn test_guest_matching() {
        let guest = GuestCredentials::with_password("Guest@Other.org", "pw");
        assert!(guest.matches("guest@other.org", Some("pw")));
        assert!(!guest.matches("guest@other.org", Some("other")));
        assert!(!guest.matches_access_key("guest@other.org", Some("pw")));

        let keyed = GuestCredentials::with_access_key("k@other.org", "abc");
        assert!(keyed.matches_access_key("k@other.org", Some("abc")));
        assert!(!keyed.matches_access_key("k@other.org", None));
    }

    #[test]
    fn test_entry_id_from_str() {
        let id = EntryId::from_name("x");
        let parsed: EntryId = id.to_string().parse().unwrap_or_default();
        assert_eq!(parsed, id);
    }
}
