//! Target types and their inheritance table
//!
//! A target is the directory entry a right is checked or granted against. Each
//! kind lists the target kinds that inherit grants from it; `global` is the
//! terminal sink every chain ends at.

use crate::errors::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of entry kinds rights can be granted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetType {
    /// User account
    Account,
    /// Calendar resource (a specialised account)
    CalResource,
    /// Static distribution list
    DistributionList,
    /// Dynamic group
    Group,
    /// Mail domain
    Domain,
    /// Class of service
    Cos,
    /// Server
    Server,
    /// Unified communications service
    UcService,
    /// XMPP component
    XmppComponent,
    /// Zimlet
    Zimlet,
    /// Global configuration
    Config,
    /// Global grant, the terminal ancestor
    Global,
}

use TargetType::*;

impl TargetType {
    /// Every target type, in declaration order
    pub const ALL: [TargetType; 12] = [
        Account,
        CalResource,
        DistributionList,
        Group,
        Domain,
        Cos,
        Server,
        UcService,
        XmppComponent,
        Zimlet,
        Config,
        Global,
    ];

    /// Code used in right definitions and inline attribute rights
    pub fn code(self) -> &'static str {
        match self {
            Account => "account",
            CalResource => "calresource",
            DistributionList => "dl",
            Group => "group",
            Domain => "domain",
            Cos => "cos",
            Server => "server",
            UcService => "ucservice",
            XmppComponent => "xmppcomponent",
            Zimlet => "zimlet",
            Config => "config",
            Global => "global",
        }
    }

    /// Look up a target type by its code
    pub fn from_code(code: &str) -> WardenResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| WardenError::invalid_request(format!("unknown target type: {code}")))
    }

    /// Target kinds that inherit grants placed on an entry of this kind
    ///
    /// Always includes the kind itself.
    pub fn inherited_by(self) -> &'static [TargetType] {
        match self {
            Account => &[Account],
            CalResource => &[CalResource],
            DistributionList => &[Account, CalResource, DistributionList],
            Group => &[Account, CalResource, Group],
            Domain => &[Account, CalResource, DistributionList, Group, Domain],
            Cos => &[Cos],
            Server => &[Server],
            UcService => &[UcService],
            XmppComponent => &[XmppComponent],
            Zimlet => &[Zimlet],
            Config => &[Config],
            Global => &Self::ALL,
        }
    }

    /// Whether grants on this kind are inherited by `other`
    pub fn is_inherited_by(self, other: TargetType) -> bool {
        self.inherited_by().contains(&other)
    }

    /// Target kinds this kind can inherit grants from, including itself
    pub fn inherits_from(self) -> Vec<TargetType> {
        Self::ALL
            .into_iter()
            .filter(|t| t.is_inherited_by(self))
            .collect()
    }

    /// Kinds that inherit from this one, excluding itself
    pub fn sub_target_types(self) -> Vec<TargetType> {
        self.inherited_by()
            .iter()
            .copied()
            .filter(|t| *t != self)
            .collect()
    }

    /// Entries of this kind live inside a domain
    pub fn is_domained(self) -> bool {
        matches!(self, Account | CalResource | DistributionList | Group)
    }

    /// Entries of this kind are addressed by name or id when granting
    pub fn needs_target_identity(self) -> bool {
        !matches!(self, Config | Global)
    }

    /// Distribution lists and dynamic groups
    pub fn is_group(self) -> bool {
        matches!(self, DistributionList | Group)
    }

    /// Inline attribute rights may be scoped to this kind
    pub fn allows_inline_attr_right(self) -> bool {
        self != Global
    }

    /// Equivalence class used for user rights
    ///
    /// User rights treat calendar resources as accounts and the two group
    /// flavours as interchangeable.
    pub fn user_right_class(self) -> TargetType {
        match self {
            CalResource => Account,
            Group => DistributionList,
            other => other,
        }
    }

    /// The other member of this kind's user-right equivalence class
    pub fn user_right_alias(self) -> TargetType {
        match self {
            Account => CalResource,
            CalResource => Account,
            DistributionList => Group,
            Group => DistributionList,
            other => other,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetType {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl TryFrom<String> for TargetType {
    type Error = WardenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_inherited_by_everything() {
        for t in TargetType::ALL {
            assert!(Global.is_inherited_by(t), "{t}");
        }
        assert_eq!(Global.inherits_from(), vec![Global]);
    }

    #[test]
    fn test_domain_inheritance() {
        assert!(Domain.is_inherited_by(Account));
        assert!(Domain.is_inherited_by(Group));
        assert!(!Domain.is_inherited_by(Cos));
        assert_eq!(
            Domain.sub_target_types(),
            vec![Account, CalResource, DistributionList, Group]
        );
    }

    #[test]
    fn test_account_inherits_from_containers() {
        assert_eq!(
            Account.inherits_from(),
            vec![Account, DistributionList, Group, Domain, Global]
        );
        assert_eq!(Server.inherits_from(), vec![Server, Global]);
        assert_eq!(UcService.inherits_from(), vec![UcService, Global]);
    }

    #[test]
    fn test_codes_round_trip() {
        for t in TargetType::ALL {
            assert_eq!(TargetType::from_code(t.code()).ok(), Some(t));
        }
        assert!(matches!(
            TargetType::from_code("mailbox"),
            Err(WardenError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_user_right_classes() {
        assert_eq!(CalResource.user_right_class(), Account);
        assert_eq!(Group.user_right_class(), DistributionList);
        assert_eq!(Domain.user_right_class(), Domain);
        assert_eq!(DistributionList.user_right_alias(), Group);
    }

    #[test]
    fn test_identity_and_domain_flags() {
        assert!(!Global.needs_target_identity());
        assert!(!Config.needs_target_identity());
        assert!(Account.is_domained());
        assert!(!Domain.is_domained());
        assert!(Group.is_group());
    }
}
