//! Error types for metainfo decoding.

use thiserror::Error;

/// Failures raised while decoding a bencoded `.torrent` payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is not valid bencoding or a field has the wrong shape.
    #[error("malformed metainfo")]
    Malformed {
        /// Byte offset of the offending token when the failure is syntactic.
        offset: Option<usize>,
        /// Static reason describing the failure.
        reason: &'static str,
    },
    /// A required key was absent and no caller-supplied fallback existed.
    #[error("metainfo field missing")]
    MissingField {
        /// Name of the missing key.
        field: &'static str,
    },
    /// The payload ended before a value or container was terminated.
    #[error("metainfo truncated")]
    Truncated {
        /// Offset at which more input was expected.
        offset: usize,
    },
}

impl DecodeError {
    pub(crate) const fn syntax(offset: usize, reason: &'static str) -> Self {
        Self::Malformed {
            offset: Some(offset),
            reason,
        }
    }

    pub(crate) const fn shape(reason: &'static str) -> Self {
        Self::Malformed {
            offset: None,
            reason,
        }
    }
}

/// Convenience alias for decode results.
pub type DecodeResult<T> = Result<T, DecodeError>;
