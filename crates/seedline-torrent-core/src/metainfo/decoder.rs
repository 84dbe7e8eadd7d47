//! `.torrent` decoding into [`TorrentMetaInfo`].

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use super::bencode::{Value, parse_document};
use crate::error::{DecodeError, DecodeResult};
use crate::model::{FileEntry, INFO_HASH_LEN, InfoHash};

/// Caller-supplied values used when the payload omits a required key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeHints {
    /// Display name fallback for a missing `info.name`.
    pub name: Option<String>,
    /// Tracker fallback for a missing `announce`/`announce-list`.
    pub tracker_url: Option<String>,
}

/// Immutable metadata decoded from a `.torrent` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentMetaInfo {
    /// Display name (`info.name.utf-8`, then `info.name`).
    pub name: String,
    /// Primary tracker announce URL.
    pub tracker_url: String,
    /// SHA-1 of the raw `info` dictionary.
    pub info_hash: InfoHash,
    /// Whether the torrent opts out of DHT/PEX.
    pub private: bool,
    /// Piece size in bytes, when declared.
    pub piece_length: Option<u64>,
    /// Files in metainfo order.
    pub files: Vec<FileEntry>,
    multi_file: bool,
}

impl TorrentMetaInfo {
    /// Whether the payload used the multi-file (`info.files`) layout.
    #[must_use]
    pub const fn is_multi_file(&self) -> bool {
        self.multi_file
    }

    /// Sum of all file lengths.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|entry| entry.size_bytes).sum()
    }
}

/// Decode a `.torrent` payload with no fallbacks.
///
/// # Errors
///
/// See [`decode_with_hints`].
pub fn decode(bytes: &[u8]) -> DecodeResult<TorrentMetaInfo> {
    decode_with_hints(bytes, &DecodeHints::default())
}

/// Decode a `.torrent` payload, consulting `hints` for missing name/tracker.
///
/// # Errors
///
/// - [`DecodeError::Truncated`] when the payload ends inside a value.
/// - [`DecodeError::Malformed`] for bad bencoding or wrongly-typed fields.
/// - [`DecodeError::MissingField`] when a required key is absent and not hinted.
pub fn decode_with_hints(bytes: &[u8], hints: &DecodeHints) -> DecodeResult<TorrentMetaInfo> {
    let document = parse_document(bytes)?;
    let root = &document.root;
    if root.as_dict().is_none() {
        return Err(DecodeError::shape("root must be a dictionary"));
    }
    let info = root
        .get("info")
        .ok_or(DecodeError::MissingField { field: "info" })?;
    if info.as_dict().is_none() {
        return Err(DecodeError::shape("info must be a dictionary"));
    }
    let span = document
        .info_span
        .ok_or(DecodeError::MissingField { field: "info" })?;
    let info_hash = hash_info(&bytes[span]);

    let name = match text_field(info, &["name.utf-8", "name"])? {
        Some(name) => name,
        None => hints
            .name
            .clone()
            .ok_or(DecodeError::MissingField { field: "name" })?,
    };
    ensure_component(&name)?;

    let tracker_url = match tracker(root)? {
        Some(url) => url,
        None => hints
            .tracker_url
            .clone()
            .ok_or(DecodeError::MissingField { field: "announce" })?,
    };

    let private = info.get("private").and_then(Value::as_integer) == Some(1);
    let piece_length = info
        .get("piece length")
        .map(|value| non_negative(value, "piece length must be a non-negative integer"))
        .transpose()?;

    let (files, multi_file) = match info.get("files") {
        Some(list) => (multi_file_entries(&name, list)?, true),
        None => {
            let length = info
                .get("length")
                .ok_or(DecodeError::MissingField { field: "length" })?;
            let size = non_negative(length, "length must be a non-negative integer")?;
            (vec![FileEntry::new(0, name.clone(), size)], false)
        }
    };

    Ok(TorrentMetaInfo {
        name,
        tracker_url,
        info_hash,
        private,
        piece_length,
        files,
        multi_file,
    })
}

fn hash_info(raw: &[u8]) -> InfoHash {
    let digest = Sha1::digest(raw);
    let mut bytes = [0_u8; INFO_HASH_LEN];
    bytes.copy_from_slice(&digest);
    InfoHash::from_bytes(bytes)
}

fn text_field(dict: &Value, keys: &[&str]) -> DecodeResult<Option<String>> {
    for key in keys {
        if let Some(value) = dict.get(key) {
            return value
                .as_str()
                .map(|text| Some(text.to_string()))
                .ok_or(DecodeError::shape("expected a utf-8 string"));
        }
    }
    Ok(None)
}

fn tracker(root: &Value) -> DecodeResult<Option<String>> {
    if let Some(url) = text_field(root, &["announce"])?
        && !url.is_empty()
    {
        return Ok(Some(url));
    }
    let Some(tiers) = root.get("announce-list") else {
        return Ok(None);
    };
    let tiers = tiers
        .as_list()
        .ok_or(DecodeError::shape("announce-list must be a list"))?;
    Ok(tiers
        .iter()
        .filter_map(Value::as_list)
        .flatten()
        .filter_map(Value::as_str)
        .find(|url| !url.is_empty())
        .map(str::to_string))
}

fn non_negative(value: &Value, reason: &'static str) -> DecodeResult<u64> {
    value
        .as_integer()
        .and_then(|number| u64::try_from(number).ok())
        .ok_or(DecodeError::shape(reason))
}

fn multi_file_entries(name: &str, list: &Value) -> DecodeResult<Vec<FileEntry>> {
    let items = list
        .as_list()
        .ok_or(DecodeError::shape("files must be a list"))?;
    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if item.as_dict().is_none() {
            return Err(DecodeError::shape("file entry must be a dictionary"));
        }
        let length = item
            .get("length")
            .ok_or(DecodeError::MissingField { field: "length" })?;
        let size = non_negative(length, "length must be a non-negative integer")?;
        let components = item
            .get("path.utf-8")
            .or_else(|| item.get("path"))
            .ok_or(DecodeError::MissingField { field: "path" })?
            .as_list()
            .ok_or(DecodeError::shape("path must be a list"))?;
        if components.is_empty() {
            return Err(DecodeError::shape("path must not be empty"));
        }
        let mut path = String::from(name);
        for component in components {
            let component = component
                .as_str()
                .ok_or(DecodeError::shape("path component must be a utf-8 string"))?;
            ensure_component(component)?;
            path.push('/');
            path.push_str(component);
        }
        let index =
            u32::try_from(index).map_err(|_| DecodeError::shape("too many file entries"))?;
        entries.push(FileEntry::new(index, path, size));
    }
    Ok(entries)
}

fn ensure_component(component: &str) -> DecodeResult<()> {
    let mut parts = Path::new(component).components();
    let single_normal = matches!(parts.next(), Some(Component::Normal(_))) && parts.next().is_none();
    if component.is_empty()
        || !single_normal
        || component.contains(['/', '\\'])
        || component == "."
        || component == ".."
    {
        return Err(DecodeError::shape("unsafe path component"));
    }
    Ok(())
}
