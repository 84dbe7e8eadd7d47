//! Filesystem primitives for torrent sessions: crash-safe companion
//! relocation and on-disk placeholder materialisation.
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

pub mod error;
pub mod placeholders;
pub mod relocate;

pub use error::{FsOpsError, FsOpsResult};
pub use placeholders::{FileEntryManager, PlaceholderReport};
pub use relocate::{
    CopiedFile, copy_file, copy_tree, move_tree, relocate_companions, remove_files,
};
