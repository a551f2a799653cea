//! Configuration loading trait

use crate::errors::{WardenError, WardenResult};
use std::path::Path;

/// Prefix of environment variables read by [`ConfigLoad::merge_with_env`]
pub const ENV_PREFIX: &str = "WARDEN_";

/// Layered configuration loading
pub trait ConfigLoad: Clone + Default + Send + Sync + 'static {
    /// Default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> WardenResult<Self>
    where
        Self: serde::de::DeserializeOwned,
    {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") | None => toml::from_str(&content)
                .map_err(|e| WardenError::config(format!("invalid TOML: {e}"))),
            Some(other) => Err(WardenError::config(format!(
                "unsupported config format: {other}"
            ))),
        }
    }

    /// Apply `WARDEN_*` variables from the process environment
    fn merge_with_env(&mut self) -> WardenResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `WARDEN_*` variables from an explicit list
    ///
    /// `WARDEN_PERMISSION_CACHE_ENABLED` maps to key `permission_cache_enabled`.
    fn merge_with_vars<I>(&mut self, vars: I) -> WardenResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                self.set_from_string(&config_key.to_lowercase(), &value)?;
            }
        }
        Ok(())
    }

    /// Merge values from another configuration that differ from the defaults
    fn merge_with(&mut self, other: &Self) -> WardenResult<()>;

    /// Check the configuration is usable
    fn validate(&self) -> WardenResult<()>;

    /// Set one value by flat key, as used by environment and CLI overrides
    fn set_from_string(&mut self, key: &str, value: &str) -> WardenResult<()>;
}
