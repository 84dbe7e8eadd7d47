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

//! File-backed configuration for Seedline.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (JSON file plus
//! environment overrides), `validate.rs` (field checks), `defaults.rs`.

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_DOWNLOAD_DIR, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_UPLOADS_DIR};
pub use model::{FolderSettings, LoggingSettings, SeedlineConfig};
