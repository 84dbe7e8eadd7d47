//! Loads [`SeedlineConfig`] from an optional JSON file and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::SeedlineConfig;
use crate::validate::validate_config;

/// Overrides `folders.download_dir`.
pub const ENV_DOWNLOAD_DIR: &str = "SEEDLINE_DOWNLOAD_DIR";
/// Overrides `folders.uploads_dir`.
pub const ENV_UPLOADS_DIR: &str = "SEEDLINE_UPLOADS_DIR";
/// Overrides `logging.level`.
pub const ENV_LOG_LEVEL: &str = "SEEDLINE_LOG_LEVEL";
/// Overrides `logging.format`.
pub const ENV_LOG_FORMAT: &str = "SEEDLINE_LOG_FORMAT";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// File + environment configuration loader.
///
/// Precedence, lowest first: built-in defaults, the JSON file, environment
/// variables. The result is validated before it is returned.
pub struct ConfigLoader {
    path: Option<PathBuf>,
    lookup: Lookup,
}

impl ConfigLoader {
    /// Loader reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            lookup: Box::new(|name: &str| std::env::var(name).ok()),
        }
    }

    /// Read settings from `path`. A missing file is an error.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the environment lookup.
    #[must_use]
    pub fn with_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Build the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] / [`ConfigError::Parse`] for an unreadable
    /// file and [`ConfigError::InvalidField`] when validation fails.
    pub fn load(&self) -> ConfigResult<SeedlineConfig> {
        let mut config = match &self.path {
            Some(path) => read_file(path)?,
            None => SeedlineConfig::default(),
        };
        self.apply_env(&mut config);
        validate_config(&config)?;
        info!(
            download_dir = %config.folders.download_dir.display(),
            uploads_dir = %config.folders.uploads_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_env(&self, config: &mut SeedlineConfig) {
        if let Some(value) = self.env(ENV_DOWNLOAD_DIR) {
            config.folders.download_dir = PathBuf::from(value);
        }
        if let Some(value) = self.env(ENV_UPLOADS_DIR) {
            config.folders.uploads_dir = PathBuf::from(value);
        }
        if let Some(value) = self.env(ENV_LOG_LEVEL) {
            config.logging.level = value;
        }
        if let Some(value) = self.env(ENV_LOG_FORMAT) {
            config.logging.format = value;
        }
    }

    fn env(&self, name: &'static str) -> Option<String> {
        let value = (self.lookup)(name).filter(|value| !value.trim().is_empty())?;
        debug!(variable = name, "environment override applied");
        Some(value)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &Path) -> ConfigResult<SeedlineConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() -> anyhow::Result<()> {
        let config = ConfigLoader::new().with_lookup(env(&[])).load()?;
        assert_eq!(config, SeedlineConfig::default());
        Ok(())
    }

    #[test]
    fn env_overrides_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("seedline.json");
        fs::write(
            &path,
            r#"{"folders":{"download_dir":"/file/in","uploads_dir":"/file/out"},"logging":{"level":"warn"}}"#,
        )?;

        let config = ConfigLoader::new()
            .with_file(&path)
            .with_lookup(env(&[(ENV_UPLOADS_DIR, "/env/out"), (ENV_LOG_FORMAT, "json")]))
            .load()?;

        assert_eq!(config.folders.download_dir, PathBuf::from("/file/in"));
        assert_eq!(config.folders.uploads_dir, PathBuf::from("/env/out"));
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
        Ok(())
    }

    #[test]
    fn blank_env_values_are_ignored() -> anyhow::Result<()> {
        let config = ConfigLoader::new()
            .with_lookup(env(&[(ENV_LOG_LEVEL, "  ")]))
            .load()?;
        assert_eq!(config.logging.level, "info");
        Ok(())
    }

    #[test]
    fn invalid_env_value_fails_validation() {
        let err = ConfigLoader::new()
            .with_lookup(env(&[(ENV_LOG_LEVEL, "chatty")]))
            .load()
            .expect_err("unknown level");
        assert!(matches!(err, ConfigError::InvalidField { field: "level", .. }));
    }

    #[test]
    fn unreadable_and_malformed_files() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let missing = ConfigLoader::new()
            .with_file(temp.path().join("absent.json"))
            .with_lookup(env(&[]))
            .load()
            .expect_err("missing file");
        assert!(matches!(missing, ConfigError::Io { .. }));

        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json")?;
        let broken = ConfigLoader::new()
            .with_file(&path)
            .with_lookup(env(&[]))
            .load()
            .expect_err("malformed file");
        assert!(matches!(broken, ConfigError::Parse { .. }));
        Ok(())
    }
}
