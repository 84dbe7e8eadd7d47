//! Metainfo builders, status snapshots and temporary folder layouts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use seedline_torrent_core::metainfo::Value;
use seedline_torrent_core::{
    DecodeResult, FolderLayout, InfoHash, TorrentMetaInfo, TorrentProgress, TorrentStatus, decode,
};
use sha1::{Digest, Sha1};
use tempfile::TempDir;

/// Builder for bencoded `.torrent` payloads.
#[derive(Debug, Clone)]
pub struct MetainfoFixture {
    name: String,
    tracker: Option<String>,
    private: bool,
    piece_length: i64,
    files: Vec<(String, u64)>,
    multi_file: bool,
}

impl MetainfoFixture {
    /// Announce URL used unless overridden.
    pub const DEFAULT_TRACKER: &'static str = "http://tracker.test/announce";

    /// Single-file torrent named `name` of `length` bytes.
    #[must_use]
    pub fn single_file(name: &str, length: u64) -> Self {
        Self {
            name: name.to_string(),
            tracker: Some(Self::DEFAULT_TRACKER.to_string()),
            private: false,
            piece_length: 16_384,
            files: vec![(name.to_string(), length)],
            multi_file: false,
        }
    }

    /// Multi-file torrent; file paths are `/`-separated and relative to `name`.
    #[must_use]
    pub fn multi_file(name: &str, files: &[(&str, u64)]) -> Self {
        Self {
            name: name.to_string(),
            tracker: Some(Self::DEFAULT_TRACKER.to_string()),
            private: false,
            piece_length: 16_384,
            files: files
                .iter()
                .map(|(path, length)| ((*path).to_string(), *length))
                .collect(),
            multi_file: true,
        }
    }

    /// Set the private flag.
    #[must_use]
    pub const fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Omit every tracker key.
    #[must_use]
    pub fn without_tracker(mut self) -> Self {
        self.tracker = None;
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `info` dictionary.
    #[must_use]
    pub fn info_value(&self) -> Value {
        let mut info = vec![
            ("name", Value::bytes(&self.name)),
            ("piece length", Value::Integer(self.piece_length)),
            ("pieces", Value::bytes([0_u8; 20])),
            ("private", Value::Integer(i64::from(self.private))),
        ];
        if self.multi_file {
            let files = self
                .files
                .iter()
                .map(|(path, length)| {
                    Value::dict([
                        ("length", Value::Integer(to_i64(*length))),
                        (
                            "path",
                            Value::List(path.split('/').map(Value::bytes).collect()),
                        ),
                    ])
                })
                .collect();
            info.push(("files", Value::List(files)));
        } else {
            let length = self.files.first().map_or(0, |(_, length)| *length);
            info.push(("length", Value::Integer(to_i64(length))));
        }
        Value::dict(info)
    }

    /// Complete metainfo dictionary.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = vec![("info", self.info_value())];
        if let Some(tracker) = &self.tracker {
            root.push(("announce", Value::bytes(tracker)));
        }
        Value::dict(root)
    }

    /// Bencoded payload.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_value().encode()
    }

    /// SHA-1 of the encoded `info` dictionary.
    #[must_use]
    pub fn info_hash(&self) -> InfoHash {
        let digest = Sha1::digest(self.info_value().encode());
        let mut bytes = [0_u8; 20];
        bytes.copy_from_slice(&digest);
        InfoHash::from_bytes(bytes)
    }

    /// Decode the payload this fixture produces.
    ///
    /// # Errors
    ///
    /// Propagates decode failures (none for well-formed fixtures).
    pub fn meta_info(&self) -> DecodeResult<TorrentMetaInfo> {
        decode(&self.to_bytes())
    }

    /// Write `<dir>/<name>.torrent` and return its path.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.torrent", self.name));
        fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Snapshot that is downloading (`done` of `total` bytes), never finished.
#[must_use]
pub fn progress_status(done: u64, total: u64) -> TorrentStatus {
    TorrentStatus {
        progress: TorrentProgress {
            bytes_downloaded: done,
            bytes_total: total,
        },
        auto_managed: true,
        ..TorrentStatus::default()
    }
}

/// Snapshot reporting full completion of `total` bytes.
#[must_use]
pub fn finished_status(total: u64) -> TorrentStatus {
    TorrentStatus {
        finished: true,
        ..progress_status(total, total)
    }
}

/// Snapshot carrying an engine error.
#[must_use]
pub fn error_status(message: &str) -> TorrentStatus {
    TorrentStatus {
        error: Some(message.to_string()),
        ..TorrentStatus::default()
    }
}

/// Download and upload folders inside a temporary directory.
#[derive(Debug)]
pub struct TempLayout {
    dir: TempDir,
    folders: FolderLayout,
}

impl TempLayout {
    /// Create `incomplete/` and `torrents/` under a fresh temp dir.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the directories cannot be created.
    pub fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        let folders = FolderLayout::new(dir.path().join("incomplete"), dir.path().join("torrents"));
        fs::create_dir_all(&folders.download_dir)?;
        fs::create_dir_all(&folders.uploads_dir)?;
        Ok(Self { dir, folders })
    }

    /// Root of the temp dir, outside both managed folders.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The managed folder layout.
    #[must_use]
    pub fn folders(&self) -> FolderLayout {
        self.folders.clone()
    }
}
