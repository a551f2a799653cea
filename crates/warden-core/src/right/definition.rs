//! Serializable right definitions
//!
//! Definitions are the input to [`RightCatalog`](super::RightCatalog)
//! construction. They are usually read from a TOML file of `[[right]]` tables.

use super::{RightDefault, RightKind};
use crate::errors::{WardenError, WardenResult};
use crate::target::TargetType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One target type or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    /// Single target type
    One(TargetType),
    /// Several target types, only valid for attribute rights
    Many(Vec<TargetType>),
}

impl TargetSpec {
    /// Flatten into a list
    pub fn to_vec(&self) -> Vec<TargetType> {
        match self {
            TargetSpec::One(t) => vec![*t],
            TargetSpec::Many(ts) => ts.clone(),
        }
    }
}

/// Definition of a single right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightDefinition {
    /// Unique right name
    pub name: String,
    /// Right kind
    #[serde(rename = "type")]
    pub kind: RightKind,
    /// User right rather than admin right
    #[serde(default)]
    pub user: bool,
    /// Target type(s) the right executes on
    #[serde(default)]
    pub target: Option<TargetSpec>,
    /// Narrower target type the right may be granted on (user rights only)
    #[serde(default)]
    pub grant_target: Option<TargetType>,
    /// Decision when nothing was granted
    #[serde(default)]
    pub default: Option<RightDefault>,
    /// Whether decisions on this right are cacheable
    #[serde(default)]
    pub cache: bool,
    /// Attributes for attribute rights; omitted means all attributes
    #[serde(default)]
    pub attrs: Option<Vec<String>>,
    /// Members of a combo right
    #[serde(default)]
    pub rights: Vec<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl RightDefinition {
    /// Minimal preset definition
    pub fn preset(name: impl Into<String>, target: TargetType, user: bool) -> Self {
        Self {
            name: name.into(),
            kind: RightKind::Preset,
            user,
            target: Some(TargetSpec::One(target)),
            grant_target: None,
            default: None,
            cache: false,
            attrs: None,
            rights: Vec::new(),
            description: None,
        }
    }

    /// Minimal combo definition
    pub fn combo(name: impl Into<String>, members: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: RightKind::Combo,
            user: false,
            target: None,
            grant_target: None,
            default: None,
            cache: false,
            attrs: None,
            rights: members.iter().map(|m| m.to_string()).collect(),
            description: None,
        }
    }

    /// Mark as cacheable
    pub fn cacheable(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Set the default decision
    pub fn with_default(mut self, default: RightDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// A complete right-definition document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightDefinitions {
    /// Definitions in declaration order
    #[serde(rename = "right", default)]
    pub rights: Vec<RightDefinition>,
}

impl RightDefinitions {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> WardenResult<Self> {
        toml::from_str(content)
            .map_err(|e| WardenError::parse(format!("invalid right definitions: {e}")))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> WardenResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::config(format!(
                "failed to read right definitions {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }
}
