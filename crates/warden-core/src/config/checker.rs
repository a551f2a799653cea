//! Right checker configuration

use super::traits::ConfigLoad;
use crate::errors::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Permission cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionCacheConfig {
    /// Consult and fill the permission cache
    pub enabled: bool,
    /// Number of targets kept before the oldest is evicted
    pub max_targets: usize,
}

impl Default for PermissionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_targets: 4096,
        }
    }
}

/// Grant policy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantPolicyConfig {
    /// Maximum lifetime of a user share in milliseconds; 0 means unlimited
    pub max_lifetime_ms: i64,
}

/// Hard rule settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardRuleConfig {
    /// Attributes that can never be modified through grants
    pub forbidden_attrs: Vec<String>,
}

impl Default for HardRuleConfig {
    fn default() -> Self {
        Self {
            forbidden_attrs: vec!["zimbraIsAdminAccount".to_string()],
        }
    }
}

/// Top-level configuration of the right checker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Permission cache
    pub permission_cache: PermissionCacheConfig,
    /// Grant policy
    pub grants: GrantPolicyConfig,
    /// Hard rules
    pub hard_rules: HardRuleConfig,
    /// Right-definition file to build the catalog from
    pub rights_file: Option<PathBuf>,
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> WardenResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WardenError::config(format!("invalid value for {key}: {value}")))
}

impl ConfigLoad for CheckerConfig {
    fn merge_with(&mut self, other: &Self) -> WardenResult<()> {
        let defaults = Self::default();
        if other.permission_cache.enabled != defaults.permission_cache.enabled {
            self.permission_cache.enabled = other.permission_cache.enabled;
        }
        if other.permission_cache.max_targets != defaults.permission_cache.max_targets {
            self.permission_cache.max_targets = other.permission_cache.max_targets;
        }
        if other.grants.max_lifetime_ms != defaults.grants.max_lifetime_ms {
            self.grants.max_lifetime_ms = other.grants.max_lifetime_ms;
        }
        if other.hard_rules.forbidden_attrs != defaults.hard_rules.forbidden_attrs {
            self.hard_rules.forbidden_attrs = other.hard_rules.forbidden_attrs.clone();
        }
        if other.rights_file.is_some() {
            self.rights_file = other.rights_file.clone();
        }
        Ok(())
    }

    fn validate(&self) -> WardenResult<()> {
        if self.permission_cache.max_targets == 0 {
            return Err(WardenError::config(
                "permission_cache.max_targets must be greater than 0",
            ));
        }
        if self.grants.max_lifetime_ms < 0 {
            return Err(WardenError::config("grants.max_lifetime_ms cannot be negative"));
        }
        if self.hard_rules.forbidden_attrs.is_empty() {
            return Err(WardenError::config(
                "hard_rules.forbidden_attrs cannot be empty",
            ));
        }
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> WardenResult<()> {
        match key.replace(|c: char| c == '-' || c == '.', "_").as_str() {
            "permission_cache_enabled" => {
                self.permission_cache.enabled = parse_value(key, value)?;
            }
            "permission_cache_max_targets" => {
                self.permission_cache.max_targets = parse_value(key, value)?;
            }
            "grants_max_lifetime_ms" => {
                self.grants.max_lifetime_ms = parse_value(key, value)?;
            }
            "hard_rules_forbidden_attrs" => {
                self.hard_rules.forbidden_attrs = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "rights_file" => self.rights_file = Some(PathBuf::from(value)),
            _ => {
                return Err(WardenError::config(format!(
                    "unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }
}
