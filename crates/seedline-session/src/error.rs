//! # Design
//!
//! - One error enum for every session-level failure class.
//! - Messages are constant; identity and paths travel in fields.
//! - Engine failures arrive as `anyhow::Error` and are boxed as the source.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use seedline_fsops::FsOpsError;
use seedline_torrent_core::{DecodeError, InfoHash};
use thiserror::Error;

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures surfaced by sessions and the registry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Identity or paths remained unresolved after every fallback.
    #[error("session initialization failed")]
    Initialization {
        /// Field that could not be resolved.
        field: &'static str,
    },
    /// The on-disk `.torrent` could not be decoded.
    #[error("metainfo decode failed")]
    Decode {
        /// Torrent file that was read.
        path: PathBuf,
        /// Underlying decode failure.
        source: DecodeError,
    },
    /// Reading a session file failed.
    #[error("session io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A session with the same info hash is already registered.
    #[error("duplicate session")]
    DuplicateSession {
        /// Conflicting info hash.
        info_hash: InfoHash,
    },
    /// The engine gateway reported itself invalid.
    #[error("engine unavailable")]
    EngineUnavailable {
        /// Session that could not be registered.
        info_hash: InfoHash,
    },
    /// Companion relocation failed part way; files may exist in both places.
    #[error("session relocation failed")]
    Relocation {
        /// Session being relocated.
        info_hash: InfoHash,
        /// Underlying filesystem failure.
        source: FsOpsError,
    },
    /// A filesystem step outside relocation failed.
    #[error("session filesystem failure")]
    Filesystem {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying filesystem failure.
        source: FsOpsError,
    },
    /// The operation requires a finished download.
    #[error("session not finished")]
    NotFinished {
        /// Session that was not finished.
        info_hash: InfoHash,
    },
    /// The session was stopped and cannot be driven further.
    #[error("session cancelled")]
    Cancelled {
        /// Cancelled session.
        info_hash: InfoHash,
    },
    /// The engine rejected a delegated operation.
    #[error("engine operation failed")]
    Engine {
        /// Gateway operation name.
        operation: &'static str,
        /// Session the operation targeted.
        info_hash: InfoHash,
        /// Engine-provided failure.
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl SessionError {
    pub(crate) fn engine(operation: &'static str, info_hash: InfoHash, source: anyhow::Error) -> Self {
        Self::Engine {
            operation,
            info_hash,
            source: source.into(),
        }
    }

    /// Whether the caller may retry later (duplicate or unavailable engine).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSession { .. } | Self::EngineUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_source_chain() {
        let hash = InfoHash::from_bytes([3; 20]);
        let err = SessionError::engine("pause_torrent", hash, anyhow::anyhow!("engine offline"));
        assert_eq!(err.to_string(), "engine operation failed");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("engine offline"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn recoverable_variants_are_flagged() {
        let hash = InfoHash::from_bytes([4; 20]);
        assert!(SessionError::DuplicateSession { info_hash: hash }.is_recoverable());
        assert!(SessionError::EngineUnavailable { info_hash: hash }.is_recoverable());
        assert!(!SessionError::Initialization { field: "name" }.is_recoverable());
    }
}
