//! Inline attribute rights of the form `get.<targetType>.<attr>`

use super::{AttrScope, Right, RightKind};
use crate::errors::{WardenError, WardenResult};
use crate::target::TargetType;
use std::collections::BTreeSet;

/// Synthesize a transient attribute right scoped to a single attribute
pub fn parse_inline_attr_right(name: &str) -> WardenResult<Right> {
    let parts: Vec<&str> = name.split('.').collect();
    let [op, target, attr] = parts.as_slice() else {
        return Err(WardenError::parse(format!(
            "inline attr right must be <op>.<targetType>.<attr>: {name}"
        )));
    };

    let kind = match *op {
        "get" => RightKind::GetAttrs,
        "set" => RightKind::SetAttrs,
        other => {
            return Err(WardenError::parse(format!(
                "inline attr right op must be get or set, got {other}: {name}"
            )))
        }
    };

    let target_type = TargetType::from_code(target).map_err(WardenError::into_parse)?;
    if !target_type.allows_inline_attr_right() {
        return Err(WardenError::parse(format!(
            "inline attr right cannot target {target_type}: {name}"
        )));
    }
    if attr.is_empty() {
        return Err(WardenError::parse(format!(
            "inline attr right is missing an attribute: {name}"
        )));
    }

    Ok(Right::attr(
        name.to_string(),
        kind,
        BTreeSet::from([target_type]),
        AttrScope::Named(BTreeSet::from([attr.to_string()])),
    ))
}
