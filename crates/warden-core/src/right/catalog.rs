//! Immutable right catalog
//!
//! The catalog is built once from [`RightDefinitions`] and then passed by
//! reference to everything that resolves right names. Cache slots are handed
//! out in definition order while building, so two catalogs built from the same
//! definitions agree on every slot.

use super::{
    parse_inline_attr_right, AttrScope, Right, RightDefinition, RightDefinitions, RightKind,
    CROSS_DOMAIN_ADMIN,
};
use crate::errors::{WardenError, WardenResult};
use crate::target::TargetType;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Registry mapping right names to descriptors
#[derive(Debug, Clone, Default)]
pub struct RightCatalog {
    rights: IndexMap<String, Arc<Right>>,
    slot_count: usize,
}

impl RightCatalog {
    /// Start an empty builder
    pub fn builder() -> RightCatalogBuilder {
        RightCatalogBuilder::default()
    }

    /// Build from a definition document
    pub fn from_definitions(definitions: &RightDefinitions) -> WardenResult<Self> {
        let mut builder = Self::builder();
        for definition in &definitions.rights {
            builder.define(definition)?;
        }
        Ok(builder.build())
    }

    /// Build from TOML text
    pub fn from_toml_str(content: &str) -> WardenResult<Self> {
        Self::from_definitions(&RightDefinitions::from_toml_str(content)?)
    }

    /// Build from a TOML file
    pub fn load(path: &Path) -> WardenResult<Self> {
        Self::from_definitions(&RightDefinitions::load(path)?)
    }

    /// Resolve a right by name
    ///
    /// Names of the form `get.<targetType>.<attr>` or `set.<targetType>.<attr>`
    /// that are not in the catalog produce a transient attribute right.
    pub fn lookup(&self, name: &str) -> WardenResult<Arc<Right>> {
        resolve(&self.rights, name)
    }

    /// Catalog entry without inline synthesis
    pub fn get(&self, name: &str) -> Option<&Arc<Right>> {
        self.rights.get(name)
    }

    /// Rights in definition order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Right>> {
        self.rights.values()
    }

    /// Number of defined rights
    pub fn len(&self) -> usize {
        self.rights.len()
    }

    /// No rights defined
    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }

    /// Number of cache slots assigned
    pub fn cache_slot_count(&self) -> usize {
        self.slot_count
    }
}

fn resolve(rights: &IndexMap<String, Arc<Right>>, name: &str) -> WardenResult<Arc<Right>> {
    if let Some(right) = rights.get(name) {
        return Ok(right.clone());
    }
    if name.contains('.') {
        return parse_inline_attr_right(name).map(Arc::new);
    }
    Err(WardenError::not_found(format!("invalid right: {name}")))
}

/// Incremental catalog construction
#[derive(Debug, Default)]
pub struct RightCatalogBuilder {
    rights: IndexMap<String, Arc<Right>>,
    next_slot: usize,
}

impl RightCatalogBuilder {
    /// Add one definition; combo members must already be defined
    pub fn define(&mut self, def: &RightDefinition) -> WardenResult<Arc<Right>> {
        let name = def.name.trim();
        if name.is_empty() {
            return Err(WardenError::parse("right name must not be empty"));
        }
        if self.rights.contains_key(name) {
            return Err(WardenError::parse(format!("right {name} is already defined")));
        }
        if def.user {
            if def.kind != RightKind::Preset {
                return Err(WardenError::parse(format!(
                    "user right {name} must be a preset right"
                )));
            }
            if name.contains('.') {
                return Err(WardenError::parse(format!(
                    "user right name {name} must not contain '.'"
                )));
            }
        }
        if def.grant_target.is_some() && !def.user {
            return Err(WardenError::parse(format!(
                "grant target type is only allowed on user rights: {name}"
            )));
        }

        let right = match def.kind {
            RightKind::Preset => self.preset(name, def)?,
            RightKind::GetAttrs | RightKind::SetAttrs => self.attr(name, def)?,
            RightKind::Combo => self.combo(name, def)?,
        };

        let slot = if def.cache {
            let slot = self.next_slot;
            self.next_slot += 1;
            Some(slot)
        } else {
            None
        };

        let right = Arc::new(
            right
                .with_description(def.description.clone())
                .with_default(def.default)
                .with_cache_slot(slot),
        );
        tracing::debug!(right = %right.name(), kind = %right.kind(), slot = ?slot, "defined right");
        self.rights.insert(name.to_string(), right.clone());
        Ok(right)
    }

    fn preset(&self, name: &str, def: &RightDefinition) -> WardenResult<Right> {
        let targets = match (&def.target, def.user) {
            (Some(spec), _) => spec.to_vec(),
            (None, true) => vec![TargetType::Account],
            (None, false) => Vec::new(),
        };
        let [target] = targets.as_slice() else {
            return Err(WardenError::parse(format!(
                "preset right {name} must have exactly one target type"
            )));
        };

        let right = Right::preset(name.to_string(), *target, def.user);
        if let Some(grant_target) = def.grant_target {
            if !right.inherits_grants_from(grant_target) {
                return Err(WardenError::parse(format!(
                    "grant target type {grant_target} is not grantable for right {name}"
                )));
            }
        }
        Ok(right.with_grant_target_type(def.grant_target))
    }

    fn attr(&self, name: &str, def: &RightDefinition) -> WardenResult<Right> {
        let targets: BTreeSet<TargetType> = def
            .target
            .as_ref()
            .map(|spec| spec.to_vec().into_iter().collect())
            .unwrap_or_default();
        if targets.is_empty() {
            return Err(WardenError::parse(format!(
                "attr right {name} must have a target type"
            )));
        }
        let scope = match &def.attrs {
            None => AttrScope::All,
            Some(attrs) if attrs.is_empty() => {
                return Err(WardenError::parse(format!(
                    "attr right {name} has an empty attribute list"
                )))
            }
            Some(attrs) => AttrScope::Named(attrs.iter().cloned().collect()),
        };
        Ok(Right::attr(name.to_string(), def.kind, targets, scope))
    }

    fn combo(&self, name: &str, def: &RightDefinition) -> WardenResult<Right> {
        if def.target.is_some() {
            return Err(WardenError::parse(format!(
                "combo right {name} cannot specify a target type"
            )));
        }
        if def.rights.is_empty() {
            return Err(WardenError::parse(format!(
                "combo right {name} has no member rights"
            )));
        }

        let mut members = Vec::with_capacity(def.rights.len());
        for member_name in &def.rights {
            let member = resolve(&self.rights, member_name).map_err(|e| match e {
                WardenError::NotFound { .. } => WardenError::parse(format!(
                    "combo right {name} references {member_name}, which must be defined first"
                )),
                other => other,
            })?;
            if member.is_user_right() {
                return Err(WardenError::invalid_request(format!(
                    "combo right {name} cannot contain user right {member_name}"
                )));
            }
            if member.name() == CROSS_DOMAIN_ADMIN {
                return Err(WardenError::invalid_request(format!(
                    "combo right {name} cannot contain {CROSS_DOMAIN_ADMIN}"
                )));
            }
            members.push(member);
        }
        Ok(Right::combo(name.to_string(), members))
    }

    /// Freeze into an immutable catalog
    pub fn build(self) -> RightCatalog {
        RightCatalog {
            rights: self.rights,
            slot_count: self.next_slot,
        }
    }
}
