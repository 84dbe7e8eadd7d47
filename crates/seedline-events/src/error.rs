//! Multicaster error primitives.

use std::fmt::{self, Display, Formatter};

/// Error emitted when the multicaster cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventsError {
    /// No tokio runtime was available to host listener tasks.
    RuntimeUnavailable {
        /// Operation that required the runtime.
        operation: &'static str,
    },
}

impl EventsError {
    /// Operation that triggered the failure.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::RuntimeUnavailable { operation } => operation,
        }
    }
}

impl Display for EventsError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("event runtime unavailable")
    }
}

impl std::error::Error for EventsError {}

/// Result wrapper for multicaster operations.
pub type EventsResult<T> = Result<T, EventsError>;
