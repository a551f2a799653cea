//! Unified error type for Warden
//!
//! Every crate in the workspace reports failures through [`WardenError`]. The
//! variants follow the authorization error taxonomy: malformed input is a
//! `Parse` error, caller mistakes are `InvalidRequest`, hard-rule outcomes are
//! `PermissionDenied` with a machine-readable [`DenialReason`], and broken
//! directory invariants are `Failure`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag naming which hard rule or policy produced a permission denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Principal is not an eligible delegated admin for an admin right
    NotEligibleAdmin,
    /// Delegated admin attempted to touch a global admin's account
    GlobalAdminTarget,
    /// Attribute may never be modified through grants
    ForbiddenAttribute,
    /// Requested grant expiry conflicts with the maximum share lifetime
    GrantExpiryPolicy,
}

impl DenialReason {
    /// Stable tag used in logs and error payloads
    pub fn tag(self) -> &'static str {
        match self {
            DenialReason::NotEligibleAdmin => "not_eligible_admin",
            DenialReason::GlobalAdminTarget => "global_admin_target",
            DenialReason::ForbiddenAttribute => "forbidden_attribute",
            DenialReason::GrantExpiryPolicy => "grant_expiry_policy",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unified error type for all Warden operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum WardenError {
    /// Malformed ACE text, inline attribute right or right definition
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
    },

    /// Expected denial produced by a hard rule or grant policy
    #[error("Permission denied ({reason}): {message}")]
    PermissionDenied {
        /// Which rule fired
        reason: DenialReason,
        /// Human readable detail
        message: String,
    },

    /// Caller supplied a request that can never be valid
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the invalid request
        message: String,
    },

    /// Internal invariant or directory consistency failure
    #[error("Failure: {message}")]
    Failure {
        /// Description of the broken invariant
        message: String,
    },

    /// Named right or entry does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl WardenError {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a tagged permission denied error
    pub fn permission_denied(reason: DenialReason, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a failure error
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Denial reason when this is a permission denied error
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::PermissionDenied { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Whether this error is an expected permission denial rather than a fault
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Re-tag any error as a parse error, keeping its message
    pub fn into_parse(self) -> Self {
        match self {
            Self::Parse { .. } => self,
            other => Self::parse(other.to_string()),
        }
    }
}

/// Standard result type for Warden operations
pub type WardenResult<T> = Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_carries_tag() {
        let err = WardenError::permission_denied(DenialReason::GlobalAdminTarget, "nope");
        assert_eq!(err.denial_reason(), Some(DenialReason::GlobalAdminTarget));
        assert!(err.to_string().contains("global_admin_target"));
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_into_parse_rewraps_message() {
        let err = WardenError::not_found("right foo").into_parse();
        assert!(matches!(err, WardenError::Parse { .. }));
        assert!(err.to_string().contains("right foo"));
    }
}
