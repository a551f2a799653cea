//! Configuration and catalog loading for the CLI

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use warden_core::{CheckerConfig, ConfigLoad, RightCatalog};

/// Defaults, then the config file when present, then `WARDEN_*` variables
pub fn load(path: &Path) -> Result<CheckerConfig> {
    let mut config = CheckerConfig::defaults();
    if path.exists() {
        let file = CheckerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        config.merge_with(&file)?;
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
    }
    config.merge_with_env()?;
    config.validate()?;
    Ok(config)
}

/// Catalog from `rights`, falling back to the configured rights file
pub fn catalog(config: &CheckerConfig, rights: Option<&Path>) -> Result<Arc<RightCatalog>> {
    let Some(path) = rights.or(config.rights_file.as_deref()) else {
        bail!("no right definitions: pass --rights or set rights_file in the config");
    };
    let catalog = RightCatalog::load(path)
        .with_context(|| format!("loading rights from {}", path.display()))?;
    tracing::debug!(rights = catalog.len(), path = %path.display(), "catalog loaded");
    Ok(Arc::new(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(
            config.permission_cache.enabled,
            CheckerConfig::default().permission_cache.enabled
        );
    }

    #[test]
    fn test_rights_flag_overrides_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[[right]]\nname = \"listCos\"\ntype = \"preset\"\ntarget = \"cos\""
        )
        .unwrap();

        let config = CheckerConfig {
            rights_file: Some("does-not-exist.toml".into()),
            ..CheckerConfig::default()
        };
        let catalog = catalog(&config, Some(file.path())).unwrap();
        assert!(catalog.get("listCos").is_some());
    }

    #[test]
    fn test_catalog_requires_a_source() {
        assert!(catalog(&CheckerConfig::default(), None).is_err());
    }
}
