//! Bencode codec and `.torrent` metainfo decoding.

pub mod bencode;
mod decoder;

pub use bencode::{Value, parse};
pub use decoder::{DecodeHints, TorrentMetaInfo, decode, decode_with_hints};
