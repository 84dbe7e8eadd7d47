//! Typed settings.

use std::path::PathBuf;

use seedline_telemetry::{LogFormat, LoggingConfig};
use seedline_torrent_core::FolderLayout;
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedlineConfig {
    /// Managed folders.
    pub folders: FolderSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Download and upload folders handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderSettings {
    /// In-progress downloads and their companion files.
    pub download_dir: PathBuf,
    /// Finished torrents and their relocated companion files.
    pub uploads_dir: PathBuf,
}

impl Default for FolderSettings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(defaults::DOWNLOAD_DIR),
            uploads_dir: PathBuf::from(defaults::UPLOADS_DIR),
        }
    }
}

/// Logging level and output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `seedline_session=debug`.
    pub level: String,
    /// `json`, `pretty` or `auto`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: defaults::LOG_FORMAT.to_string(),
        }
    }
}

impl SeedlineConfig {
    /// Folder layout consumed by engine gateways and sessions.
    #[must_use]
    pub fn folder_layout(&self) -> FolderLayout {
        FolderLayout::new(
            self.folders.download_dir.clone(),
            self.folders.uploads_dir.clone(),
        )
    }

    /// Telemetry configuration borrowing from these settings. Unknown formats
    /// fall back to the build default; validation rejects them earlier.
    #[must_use]
    pub fn logging_config<'a>(&'a self, build_sha: &'a str) -> LoggingConfig<'a> {
        LoggingConfig {
            level: &self.logging.level,
            format: LogFormat::parse(&self.logging.format).unwrap_or_else(LogFormat::infer),
            build_sha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() -> anyhow::Result<()> {
        let config: SeedlineConfig =
            serde_json::from_str(r#"{"folders":{"download_dir":"/srv/incoming"}}"#)?;
        assert_eq!(config.folders.download_dir, PathBuf::from("/srv/incoming"));
        assert_eq!(config.folders.uploads_dir, PathBuf::from(defaults::UPLOADS_DIR));
        assert_eq!(config.logging, LoggingSettings::default());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<SeedlineConfig>(r#"{"engine":{}}"#).is_err());
    }

    #[test]
    fn derives_layout_and_logging() {
        let mut config = SeedlineConfig::default();
        config.logging.format = "json".into();
        let layout = config.folder_layout();
        assert_eq!(layout.download_dir, PathBuf::from(defaults::DOWNLOAD_DIR));
        let logging = config.logging_config("abc");
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.level, "info");
        assert_eq!(logging.build_sha, "abc");
    }
}
