//! Right taxonomy
//!
//! A [`Right`] is immutable once the [`RightCatalog`] is built. There are four
//! kinds: preset rights that name a single operation, get/set attribute rights
//! that govern attribute access, and combo rights that bundle admin rights.
//! User rights are always preset rights and live in a namespace disjoint from
//! admin rights.

mod catalog;
mod definition;
mod inline;

pub use catalog::{RightCatalog, RightCatalogBuilder};
pub use definition::{RightDefinition, RightDefinitions, TargetSpec};
pub use inline::parse_inline_attr_right;

use crate::target::TargetType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Name of the admin right resolved by the cross-domain rules
pub const CROSS_DOMAIN_ADMIN: &str = "crossDomainAdmin";

/// The four right kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RightKind {
    /// Single named operation
    Preset,
    /// Read access to attributes
    GetAttrs,
    /// Write access to attributes
    SetAttrs,
    /// Bundle of admin rights
    Combo,
}

impl RightKind {
    /// Attribute right of either direction
    pub fn is_attr(self) -> bool {
        matches!(self, RightKind::GetAttrs | RightKind::SetAttrs)
    }
}

impl fmt::Display for RightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RightKind::Preset => "preset",
            RightKind::GetAttrs => "getAttrs",
            RightKind::SetAttrs => "setAttrs",
            RightKind::Combo => "combo",
        };
        f.write_str(s)
    }
}

/// Decision applied when no grant in the chain mentions the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RightDefault {
    /// Allow when nothing was granted
    Allow,
    /// Deny when nothing was granted
    Deny,
}

/// Attributes governed by an attribute right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrScope {
    /// Not an attribute right
    None,
    /// Every attribute of the target type
    All,
    /// An explicit attribute list
    Named(BTreeSet<String>),
}

impl AttrScope {
    /// Whether `attr` falls under this scope
    pub fn covers(&self, attr: &str) -> bool {
        match self {
            AttrScope::None => false,
            AttrScope::All => true,
            AttrScope::Named(names) => names.iter().any(|n| n.eq_ignore_ascii_case(attr)),
        }
    }
}

/// An immutable right descriptor
#[derive(Debug, Clone)]
pub struct Right {
    name: String,
    kind: RightKind,
    user_right: bool,
    description: Option<String>,
    target_types: BTreeSet<TargetType>,
    grant_target_type: Option<TargetType>,
    default: Option<RightDefault>,
    cache_slot: Option<usize>,
    attrs: AttrScope,
    members: Vec<Arc<Right>>,
}

impl Right {
    pub(crate) fn preset(name: String, target: TargetType, user_right: bool) -> Self {
        Self {
            name,
            kind: RightKind::Preset,
            user_right,
            description: None,
            target_types: BTreeSet::from([target]),
            grant_target_type: None,
            default: None,
            cache_slot: None,
            attrs: AttrScope::None,
            members: Vec::new(),
        }
    }

    pub(crate) fn attr(
        name: String,
        kind: RightKind,
        targets: BTreeSet<TargetType>,
        attrs: AttrScope,
    ) -> Self {
        Self {
            name,
            kind,
            user_right: false,
            description: None,
            target_types: targets,
            grant_target_type: None,
            default: None,
            cache_slot: None,
            attrs,
            members: Vec::new(),
        }
    }

    pub(crate) fn combo(name: String, members: Vec<Arc<Right>>) -> Self {
        Self {
            name,
            kind: RightKind::Combo,
            user_right: false,
            description: None,
            target_types: BTreeSet::new(),
            grant_target_type: None,
            default: None,
            cache_slot: None,
            attrs: AttrScope::None,
            members,
        }
    }

    pub(crate) fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub(crate) fn with_default(mut self, default: Option<RightDefault>) -> Self {
        self.default = default;
        self
    }

    pub(crate) fn with_cache_slot(mut self, slot: Option<usize>) -> Self {
        self.cache_slot = slot;
        self
    }

    pub(crate) fn with_grant_target_type(mut self, target: Option<TargetType>) -> Self {
        self.grant_target_type = target;
        self
    }

    /// Globally unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Right kind
    pub fn kind(&self) -> RightKind {
        self.kind
    }

    /// User right rather than admin right
    pub fn is_user_right(&self) -> bool {
        self.user_right
    }

    /// Preset right
    pub fn is_preset(&self) -> bool {
        self.kind == RightKind::Preset
    }

    /// Get or set attribute right
    pub fn is_attr_right(&self) -> bool {
        self.kind.is_attr()
    }

    /// Combo right
    pub fn is_combo(&self) -> bool {
        self.kind == RightKind::Combo
    }

    /// The cross-domain admin right
    pub fn is_cross_domain_admin(&self) -> bool {
        self.name == CROSS_DOMAIN_ADMIN
    }

    /// Free-form description from the definition
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Target types this right executes on; empty for combos
    pub fn target_types(&self) -> &BTreeSet<TargetType> {
        &self.target_types
    }

    /// Single target type of a preset right
    pub fn target_type(&self) -> Option<TargetType> {
        if self.is_preset() {
            self.target_types.iter().next().copied()
        } else {
            None
        }
    }

    /// Narrower target type the right may be granted on
    pub fn grant_target_type(&self) -> Option<TargetType> {
        self.grant_target_type
    }

    /// Decision used when no grant mentions this right
    pub fn default_decision(&self) -> Option<RightDefault> {
        self.default
    }

    /// Dense cache slot for cacheable rights
    pub fn cache_slot(&self) -> Option<usize> {
        self.cache_slot
    }

    /// Whether decisions on this right may be cached
    pub fn is_cacheable(&self) -> bool {
        self.cache_slot.is_some()
    }

    /// Attributes governed by an attribute right
    pub fn attrs(&self) -> &AttrScope {
        &self.attrs
    }

    /// Direct members of a combo right
    pub fn members(&self) -> &[Arc<Right>] {
        &self.members
    }

    /// Can the right be executed on an entry of `target`
    pub fn is_executable_on(&self, target: TargetType) -> bool {
        match self.kind {
            RightKind::Preset => self.target_types.iter().any(|rt| {
                if self.user_right {
                    rt.user_right_class() == target.user_right_class()
                } else {
                    *rt == target
                }
            }),
            RightKind::GetAttrs | RightKind::SetAttrs => self.target_types.contains(&target),
            RightKind::Combo => self.members.iter().any(|m| m.is_executable_on(target)),
        }
    }

    /// Can the right be granted on an entry of `target`
    pub fn is_grantable_on(&self, target: TargetType) -> bool {
        match self.kind {
            RightKind::Preset => match self.grant_target_type {
                Some(grant_target) if self.user_right => {
                    grant_target.user_right_class() == target.user_right_class()
                }
                Some(grant_target) => grant_target == target,
                None => self.inherits_grants_from(target),
            },
            RightKind::GetAttrs | RightKind::SetAttrs => self
                .target_types
                .iter()
                .all(|rt| target.is_inherited_by(*rt)),
            RightKind::Combo => {
                !self.members.is_empty() && self.members.iter().all(|m| m.is_grantable_on(target))
            }
        }
    }

    /// Grants placed on `target` reach the entries this preset right executes on
    pub(crate) fn inherits_grants_from(&self, target: TargetType) -> bool {
        self.target_types.iter().any(|rt| {
            target.is_inherited_by(*rt)
                || (self.user_right && target.is_inherited_by(rt.user_right_alias()))
        })
    }

    /// Grantable when delegating, executable otherwise
    pub fn is_applicable_on(&self, target: TargetType, delegate: bool) -> bool {
        if delegate {
            self.is_grantable_on(target)
        } else {
            self.is_executable_on(target)
        }
    }

    /// The sub-domain modifier is only meaningful for rights executed on domains
    pub fn allows_sub_domain_modifier(&self) -> bool {
        self.is_executable_on(TargetType::Domain)
    }

    /// The disinherit-sub-groups modifier needs a right that reaches group members
    pub fn allows_disinherit_sub_groups_modifier(&self) -> bool {
        self.is_executable_on(TargetType::DistributionList)
            || self.is_executable_on(TargetType::Account)
            || self.is_executable_on(TargetType::CalResource)
    }

    /// True when `preset` is a direct or nested member of this combo
    pub fn contains_preset_right(&self, preset: &Right) -> bool {
        self.members.iter().any(|member| match member.kind {
            RightKind::Preset => member.name == preset.name,
            RightKind::Combo => member.contains_preset_right(preset),
            RightKind::GetAttrs | RightKind::SetAttrs => false,
        })
    }

    /// Whether a grant of this right satisfies a check of `needed`
    pub fn satisfies(&self, needed: &Right) -> bool {
        match self.kind {
            RightKind::Preset => self.name == needed.name,
            RightKind::Combo => self.contains_preset_right(needed),
            RightKind::GetAttrs | RightKind::SetAttrs => false,
        }
    }
}

impl PartialEq for Right {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for Right {}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
