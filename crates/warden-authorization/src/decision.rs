//! Three-valued check results and their provenance

use crate::grant::Grant;
use serde::{Deserialize, Serialize};
use std::fmt;
use warden_core::{GranteeType, RightDefault, TargetType};

/// Outcome of a right check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// A matching positive grant, or a bypass rule
    Allow,
    /// A matching negative grant, or the right was seen without a matching grantee
    Deny,
    /// No grant anywhere in the chain mentioned the right
    NoDecision,
}

impl Decision {
    /// Collapse to a boolean, using `default` for [`Decision::NoDecision`]
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Decision::Allow => true,
            Decision::Deny => false,
            Decision::NoDecision => default,
        }
    }

    /// Collapse using the right's configured default, then `fallback`
    pub fn resolve_with(self, right_default: Option<RightDefault>, fallback: bool) -> bool {
        let default = match right_default {
            Some(RightDefault::Allow) => true,
            Some(RightDefault::Deny) => false,
            None => fallback,
        };
        self.resolve(default)
    }

    /// Definitive allow or deny
    pub fn is_definitive(self) -> bool {
        self != Decision::NoDecision
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
            Decision::NoDecision => "NO-DECISION",
        };
        f.write_str(s)
    }
}

/// The grant that produced a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaGrant {
    /// Type of the entry holding the grant
    pub target_type: Option<TargetType>,
    /// Name of the entry holding the grant
    pub target_name: Option<String>,
    /// Grantee type of the grant
    pub grantee_type: GranteeType,
    /// Grantee id of the grant
    pub grantee: String,
    /// Granted right, which may be a combo containing the checked right
    pub right: String,
    /// Negative grant
    pub negative: bool,
}

impl From<&Grant> for ViaGrant {
    fn from(grant: &Grant) -> Self {
        Self {
            target_type: grant.origin().map(|o| o.target_type),
            target_name: grant.origin().map(|o| o.target_name.clone()),
            grantee_type: grant.grantee_type(),
            grantee: grant.grantee().to_string(),
            right: grant.right().name().to_string(),
            negative: grant.is_deny(),
        }
    }
}

impl fmt::Display for ViaGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} granted to {} {} on {}={}",
            if self.negative { "-" } else { "" },
            self.right,
            self.grantee_type,
            self.grantee,
            self.target_type.map(|t| t.code()).unwrap_or("?"),
            self.target_name.as_deref().unwrap_or("?"),
        )
    }
}

/// Decision plus the grant that produced it, when requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The decision
    pub decision: Decision,
    /// Deciding grant; absent for bypasses, cache hits and when not requested
    pub via: Option<ViaGrant>,
}

impl Evaluation {
    /// Decision without provenance
    pub fn bare(decision: Decision) -> Self {
        Self {
            decision,
            via: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_defaults_only_without_decision() {
        assert!(Decision::Allow.resolve_with(Some(RightDefault::Deny), false));
        assert!(!Decision::Deny.resolve_with(Some(RightDefault::Allow), true));
        assert!(Decision::NoDecision.resolve_with(Some(RightDefault::Allow), false));
        assert!(!Decision::NoDecision.resolve_with(None, false));
        assert!(Decision::NoDecision.resolve_with(None, true));
    }
}
