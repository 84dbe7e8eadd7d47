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
#![allow(
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions
)]

//! Offline `.torrent` tooling over the Seedline libraries.
//!
//! Layout:
//! - `cli.rs`: argument parsing, config/logging bootstrap and dispatch
//! - `commands/`: one handler per subcommand
//! - `gateway.rs`: detached engine gateway used to resolve sessions offline
//! - `error.rs`: exit-code aware error type
//! - `output.rs`: table and JSON renderers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod commands;
pub(crate) mod error;
pub(crate) mod gateway;
pub(crate) mod output;

pub use cli::run;
