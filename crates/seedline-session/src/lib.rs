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

//! Torrent session lifecycle: parameter resolution, the per-session state
//! machine that reconciles engine callbacks, and the registry enforcing one
//! live session per info hash.

pub mod error;
pub mod params;
pub mod registry;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use params::{SessionIdentity, SessionParams};
pub use registry::SessionRegistry;
pub use session::{SessionLifecycle, TorrentSession};
