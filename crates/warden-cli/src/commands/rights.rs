// Right catalog listing

use anyhow::Result;
use warden_core::{Right, RightCatalog};

pub fn list(catalog: &RightCatalog, user_only: bool) -> Result<()> {
    for right in catalog.iter().filter(|r| !user_only || r.is_user_right()) {
        println!("{}", describe(right));
    }
    Ok(())
}

fn describe(right: &Right) -> String {
    let scope = if right.is_user_right() { "user" } else { "admin" };
    let targets = right
        .target_types()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut line = format!(
        "{:<32} {:<6} {:<8} {}",
        right.name(),
        scope,
        right.kind().to_string(),
        targets
    );
    if let Some(slot) = right.cache_slot() {
        line.push_str(&format!(" cache={slot}"));
    }
    if let Some(default) = right.default_decision() {
        line.push_str(&format!(" default={default:?}"));
    }
    if right.is_combo() {
        let members = right
            .members()
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(",");
        line.push_str(&format!(" [{members}]"));
    }
    line
}
