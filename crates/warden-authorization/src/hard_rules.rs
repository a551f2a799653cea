//! Rules that apply before any grant is consulted

use crate::decision::Decision;
use crate::errors::{DenialReason, WardenError, WardenResult};
use std::collections::BTreeSet;
use warden_core::config::HardRuleConfig;
use warden_core::{Entry, Principal, Right};

/// Bypasses and hard denials evaluated ahead of the ACL walk
#[derive(Debug, Clone, Default)]
pub struct HardRules {
    forbidden_attrs: BTreeSet<String>,
}

impl HardRules {
    /// Rules forbidding the given attributes, compared case-insensitively
    pub fn new<I, S>(forbidden_attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            forbidden_attrs: forbidden_attrs
                .into_iter()
                .map(|a| a.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Rules from configuration
    pub fn from_config(config: &HardRuleConfig) -> Self {
        Self::new(&config.forbidden_attrs)
    }

    /// Apply the hard rules
    ///
    /// Returns `Some(Allow)` for a global admin acting as admin, an error when
    /// the request is refused outright, and `None` when the grants decide.
    pub fn check(
        &self,
        principal: &Principal,
        target: &Entry,
        right: &Right,
        as_admin: bool,
    ) -> WardenResult<Option<Decision>> {
        if as_admin && principal.is_global_admin() {
            return Ok(Some(Decision::Allow));
        }

        if right.is_user_right() {
            return Ok(None);
        }

        if !(as_admin && principal.is_delegated_admin()) {
            return Err(WardenError::permission_denied(
                DenialReason::NotEligibleAdmin,
                "not an eligible admin account",
            ));
        }

        if target.is_global_admin() {
            return Err(WardenError::permission_denied(
                DenialReason::GlobalAdminTarget,
                "delegated admin is not allowed to access a global admin's account",
            ));
        }

        Ok(None)
    }

    /// Refuse attribute rights touching a forbidden attribute
    pub fn check_forbidden_attr(&self, attr: &str) -> WardenResult<()> {
        if self.forbidden_attrs.contains(&attr.to_ascii_lowercase()) {
            return Err(WardenError::permission_denied(
                DenialReason::ForbiddenAttribute,
                format!("attribute {attr} cannot be granted"),
            ));
        }
        Ok(())
    }

    /// Forbidden attributes, lower-cased
    pub fn forbidden_attrs(&self) -> impl Iterator<Item = &str> {
        self.forbidden_attrs.iter().map(String::as_str)
    }
}
