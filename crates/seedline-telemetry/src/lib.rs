#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Logging setup shared by the Seedline binaries.

pub mod error;
pub mod init;

pub use error::{TelemetryError, TelemetryResult};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
