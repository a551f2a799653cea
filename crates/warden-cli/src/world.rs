//! Fixture worlds: a directory described in TOML
//!
//! ```toml
//! domains = ["example.com"]
//!
//! [[accounts]]
//! email = "admin@example.com"
//! admin = "delegated"
//!
//! [[groups]]
//! email = "staff@example.com"
//! admin_group = true
//! members = ["admin@example.com"]
//!
//! [[grants]]
//! target = "example.com"
//! grantee = "staff@example.com"
//! type = "grp"
//! right = "createAccount"
//! ```
//!
//! Grantees of types that carry an entry id may be written by name. A grant
//! with an `expiry` (epoch milliseconds, `0` for never) is checked against the
//! configured share lifetime.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use warden_authorization::{AclStore, Directory, Grant, MemoryDirectory, RightModifier};
use warden_core::config::GrantPolicyConfig;
use warden_core::{AdminFlags, Entry, EntryId, EntryKind, GranteeType, RightCatalog};

/// Name that addresses the global grant entry
pub const GLOBAL_GRANT: &str = "globalgrant";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    #[default]
    None,
    Delegated,
    Global,
}

impl AdminLevel {
    fn flags(self) -> AdminFlags {
        AdminFlags {
            global_admin: self == AdminLevel::Global,
            delegated_admin: self == AdminLevel::Delegated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSpec {
    pub email: String,
    #[serde(default)]
    pub admin: AdminLevel,
    #[serde(default)]
    pub calendar_resource: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub email: String,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub admin_group: bool,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantSpec {
    pub target: String,
    #[serde(default)]
    pub grantee: String,
    #[serde(rename = "type")]
    pub grantee_type: String,
    pub right: String,
    #[serde(default)]
    pub modifier: Option<char>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
}

/// Parsed world file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldSpec {
    pub domains: Vec<String>,
    pub cos: Vec<String>,
    pub accounts: Vec<AccountSpec>,
    pub groups: Vec<GroupSpec>,
    pub grants: Vec<GrantSpec>,
}

impl WorldSpec {
    /// Read a world file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read world file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid world file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Populate a fresh directory; grants are validated as they are stored
    pub fn build(
        &self,
        catalog: &RightCatalog,
        policy: &GrantPolicyConfig,
    ) -> Result<Arc<MemoryDirectory>> {
        let directory = Arc::new(MemoryDirectory::new());

        for domain in &self.domains {
            ensure_domain(&directory, domain)?;
        }
        for name in &self.cos {
            directory.add_entry(Entry::new(EntryId::from_name(name), name, EntryKind::Cos));
        }
        for account in &self.accounts {
            let flags = account.admin.flags();
            let kind = if account.calendar_resource {
                EntryKind::CalResource(flags)
            } else {
                EntryKind::Account(flags)
            };
            add_domained(&directory, &account.email, kind)?;
        }
        for group in &self.groups {
            let kind = if group.dynamic {
                EntryKind::DynamicGroup {
                    admin_group: group.admin_group,
                }
            } else {
                EntryKind::DistributionList {
                    admin_group: group.admin_group,
                }
            };
            add_domained(&directory, &group.email, kind)?;
        }
        for group in &self.groups {
            let group_entry = lookup(&*directory, &group.email)?;
            for member in &group.members {
                let member = lookup(&*directory, member)
                    .with_context(|| format!("member of {}", group.email))?;
                directory.add_member(group_entry.id, member.id);
            }
        }

        let acls = AclStore::new(&*directory, catalog).with_grant_policy(policy);
        for spec in &self.grants {
            let target = lookup(&*directory, &spec.target)?;
            let grant = spec.to_grant(&*directory, catalog)?;
            let context = || format!("granting {} on {}", spec.right, spec.target);
            match spec.expiry.as_deref() {
                Some(expiry) => {
                    let (_, expires) = acls
                        .grant_expiring(&target, &[grant], Some(expiry))
                        .with_context(context)?;
                    tracing::debug!(entry = %target.name, right = %spec.right, expires, "expiring grant");
                }
                None => {
                    acls.grant(&target, &[grant]).with_context(context)?;
                }
            }
        }

        tracing::debug!(
            domains = self.domains.len(),
            accounts = self.accounts.len(),
            groups = self.groups.len(),
            grants = self.grants.len(),
            "world loaded"
        );
        Ok(directory)
    }
}

impl GrantSpec {
    fn to_grant(&self, directory: &dyn Directory, catalog: &RightCatalog) -> Result<Grant> {
        let grantee_type = GranteeType::from_code(&self.grantee_type)?;
        let right = catalog.lookup(&self.right)?;
        let modifier = match self.modifier {
            Some(c) => Some(
                RightModifier::from_char(c).ok_or_else(|| anyhow!("unknown right modifier {c}"))?,
            ),
            None => None,
        };
        let grantee = if grantee_type.requires_uuid() && self.grantee.parse::<EntryId>().is_err() {
            lookup(directory, &self.grantee)?.id.to_string()
        } else {
            self.grantee.clone()
        };
        Ok(Grant::new(
            grantee,
            grantee_type,
            right,
            modifier,
            self.secret.clone(),
        ))
    }
}

fn ensure_domain(directory: &MemoryDirectory, name: &str) -> Result<Arc<Entry>> {
    if let Some(domain) = directory.domain_by_name(name)? {
        return Ok(domain);
    }
    Ok(directory.add_entry(Entry::new(EntryId::from_name(name), name, EntryKind::Domain)))
}

fn add_domained(directory: &MemoryDirectory, email: &str, kind: EntryKind) -> Result<Arc<Entry>> {
    let Some((_, domain)) = email.split_once('@') else {
        bail!("{email} is not an email address");
    };
    let domain = ensure_domain(directory, domain)?;
    Ok(directory.add_entry(Entry::new(EntryId::from_name(email), email, kind).in_domain(domain.id)))
}

/// Entry by name, id, or [`GLOBAL_GRANT`]
pub fn lookup(directory: &dyn Directory, name: &str) -> Result<Arc<Entry>> {
    if name.eq_ignore_ascii_case(GLOBAL_GRANT) {
        return Ok(directory.global_grant()?);
    }
    if let Ok(id) = name.parse::<EntryId>() {
        if let Some(entry) = directory.entry_by_id(&id)? {
            return Ok(entry);
        }
    }
    if let Some(domain) = directory.domain_by_name(name)? {
        return Ok(domain);
    }
    directory
        .entry_by_id(&EntryId::from_name(name))?
        .ok_or_else(|| anyhow!("no such entry: {name}"))
}
