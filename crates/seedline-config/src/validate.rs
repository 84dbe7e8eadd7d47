//! Field validation for loaded configuration.

use std::path::Path;

use seedline_telemetry::LogFormat;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{FolderSettings, LoggingSettings, SeedlineConfig};

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validate every section of `config`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first offending field.
pub fn validate_config(config: &SeedlineConfig) -> ConfigResult<()> {
    validate_folders(&config.folders)?;
    validate_logging(&config.logging)
}

/// Both folders must be non-empty and distinct.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the offending folder.
pub fn validate_folders(folders: &FolderSettings) -> ConfigResult<()> {
    ensure_path("download_dir", &folders.download_dir)?;
    ensure_path("uploads_dir", &folders.uploads_dir)?;
    if folders.download_dir == folders.uploads_dir {
        return Err(ConfigError::invalid(
            "folders",
            "uploads_dir",
            folders.uploads_dir.to_str(),
            "must differ from download_dir",
        ));
    }
    Ok(())
}

/// The level must be a known level or a comma-separated list of
/// `target=level` directives; the format must be `json`, `pretty` or `auto`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the offending field.
pub fn validate_logging(logging: &LoggingSettings) -> ConfigResult<()> {
    if !is_level_directive(&logging.level) {
        return Err(ConfigError::invalid(
            "logging",
            "level",
            Some(logging.level.as_str()),
            "unknown log level",
        ));
    }
    if LogFormat::parse(&logging.format).is_none() {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            Some(logging.format.as_str()),
            "unknown log format",
        ));
    }
    Ok(())
}

fn ensure_path(field: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid("folders", field, None, "must not be empty"));
    }
    Ok(())
}

fn is_level_directive(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && value.split(',').all(|directive| {
            let level = directive
                .rsplit_once('=')
                .map_or(directive, |(target, level)| {
                    if target.trim().is_empty() { "" } else { level }
                });
            LEVELS.contains(&level.trim().to_ascii_lowercase().as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&SeedlineConfig::default()).is_ok());
    }

    #[test]
    fn empty_or_shared_folders_are_rejected() {
        let mut folders = FolderSettings {
            download_dir: PathBuf::new(),
            ..FolderSettings::default()
        };
        assert!(matches!(
            validate_folders(&folders),
            Err(ConfigError::InvalidField {
                field: "download_dir",
                ..
            })
        ));

        folders.download_dir = PathBuf::from("/data");
        folders.uploads_dir = PathBuf::from("/data");
        assert!(matches!(
            validate_folders(&folders),
            Err(ConfigError::InvalidField {
                field: "uploads_dir",
                reason: "must differ from download_dir",
                ..
            })
        ));
    }

    #[test]
    fn level_directives() {
        for ok in ["info", "DEBUG", "seedline_session=trace,warn", "a=off"] {
            assert!(is_level_directive(ok), "{ok}");
        }
        for bad in ["", "loud", "=info", "seedline=verbose"] {
            assert!(!is_level_directive(bad), "{bad}");
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let logging = LoggingSettings {
            format: "xml".into(),
            ..LoggingSettings::default()
        };
        assert!(matches!(
            validate_logging(&logging),
            Err(ConfigError::InvalidField { field: "format", .. })
        ));
    }
}
