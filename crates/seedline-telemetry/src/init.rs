//! Tracing subscriber installation and logging configuration.

use std::io;

use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Level used when neither `RUST_LOG` nor configuration provide one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Install the global tracing subscriber.
///
/// Output goes to stderr. `RUST_LOG` takes precedence over `config.level`.
/// The build SHA is recorded on the first call only.
///
/// # Errors
///
/// Returns [`TelemetryError::SubscriberInstall`] when a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig<'_>) -> TelemetryResult<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })?;

    info!(build_sha = build_sha(), format = ?config.format, "logging initialised");
    Ok(())
}

/// Build SHA recorded by [`init_logging`], or `dev` before it ran.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `seedline_session=debug`).
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
    /// Build identifier recorded once.
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
        }
    }
}

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON objects.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse `json`, `pretty` or `auto` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "auto" => Some(Self::infer()),
            _ => None,
        }
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
