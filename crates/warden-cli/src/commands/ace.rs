// ACE decoding and ACL display

use crate::world::{lookup, WorldSpec};
use anyhow::Result;
use serde_json::{json, Value};
use std::path::Path;
use warden_authorization::{AclStore, Grant};
use warden_core::config::GrantPolicyConfig;
use warden_core::RightCatalog;

pub fn parse(catalog: &RightCatalog, ace: &str) -> Result<()> {
    let grant = Grant::parse(ace, catalog)?;
    grant.validate()?;
    println!("{}", serde_json::to_string_pretty(&describe(&grant))?);
    Ok(())
}

pub fn show_acl(
    catalog: &RightCatalog,
    policy: &GrantPolicyConfig,
    world: &Path,
    target: &str,
) -> Result<()> {
    let directory = WorldSpec::load(world)?.build(catalog, policy)?;
    let entry = lookup(&*directory, target)?;
    let acls = AclStore::new(&*directory, catalog);
    match acls.grant_set(&entry)? {
        Some(set) => {
            for grant in set.all() {
                println!("{grant}");
            }
        }
        None => tracing::info!(entry = %entry.name, "no grants"),
    }
    Ok(())
}

fn describe(grant: &Grant) -> Value {
    json!({
        "ace": grant.serialize(),
        "grantee": grant.grantee(),
        "grantee_type": grant.grantee_type().code(),
        "right": grant.right().name(),
        "deny": grant.is_deny(),
        "can_delegate": grant.can_delegate(),
        "sub_domain": grant.sub_domain(),
        "disinherit_sub_groups": grant.disinherit_sub_groups(),
        "has_secret": grant.secret().is_some(),
    })
}
