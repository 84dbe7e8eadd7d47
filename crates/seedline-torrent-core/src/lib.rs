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

//! Engine-agnostic torrent session types, the metainfo decoder, and the
//! gateway contract implemented by transfer engines.
//!
//! Layout: `model` (DTOs shared across the workspace), `metainfo` (bencode
//! codec and `.torrent` decoding), `service` (engine gateway traits),
//! `error` (decode failures).

pub mod error;
pub mod metainfo;
pub mod model;
pub mod service;

pub use error::{DecodeError, DecodeResult};
pub use metainfo::{DecodeHints, TorrentMetaInfo, decode, decode_with_hints};
pub use model::{
    AlertCategory, FileEntry, FilePriority, FolderLayout, InfoHash, InvalidInfoHash,
    TorrentAlert, TorrentPeer, TorrentProgress, TorrentRates, TorrentStatus,
};
pub use service::{EngineGateway, StatusSink, TorrentRegistration};
