//! Configuration for the authorization core
//!
//! Configuration is layered: defaults, then a TOML file, then `WARDEN_*`
//! environment variables, then explicit `key=value` overrides.

mod checker;
mod traits;

pub use checker::{CheckerConfig, GrantPolicyConfig, HardRuleConfig, PermissionCacheConfig};
pub use traits::{ConfigLoad, ENV_PREFIX};
