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

//! Session lifecycle events and the asynchronous multicaster that fans them
//! out to listeners.
//!
//! Every listener owns an unbounded FIFO queue drained by its own task, so a
//! producer never waits on listener code and each listener observes events in
//! broadcast order.

pub mod error;
pub mod multicaster;
pub mod payloads;

pub use error::{EventsError, EventsResult};
pub use multicaster::{EventListener, EventMulticaster, EventStream, ListenerId};
pub use payloads::{EventEnvelope, EventId, TorrentEvent};
