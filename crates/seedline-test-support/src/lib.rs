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

//! Shared test helpers used across the workspace.
//! Layout: fixtures.rs (metainfo builders, status snapshots, temp folders), mocks.rs (in-memory engine gateway).

pub mod fixtures;
pub mod mocks;
