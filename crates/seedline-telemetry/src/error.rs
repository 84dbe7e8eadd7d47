//! Error types for telemetry setup.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing telemetry.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed, usually because one is
    /// already set globally.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
        }
    }
}
