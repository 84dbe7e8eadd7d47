//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Reading the configuration file failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file was not valid JSON for the settings model.
    #[error("configuration document could not be parsed")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<&str>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: value.map(str::to_string),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant() {
        let invalid = ConfigError::invalid("logging", "level", Some("loud"), "unknown level");
        assert_eq!(invalid.to_string(), "invalid configuration field");
        assert!(invalid.source().is_none());

        let io = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("seedline.json"),
            source: io::Error::other("denied"),
        };
        assert_eq!(io.to_string(), "filesystem operation failed");
        assert!(io.source().is_some());
    }
}
