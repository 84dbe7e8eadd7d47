//! # Design
//!
//! - Structured, constant-message errors for session filesystem work.
//! - Operation and path context live in fields, never in the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by relocation and placeholder helpers.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Operation label, when the failure came from a filesystem call.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Io { operation, .. } | Self::Walkdir { operation, .. } => Some(operation),
            Self::InvalidInput { .. } => None,
        }
    }
}
