//! Core torrent domain types and DTOs shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length in bytes of a v1 info hash (SHA-1 digest).
pub const INFO_HASH_LEN: usize = 20;

/// Content identifier derived from the bencoded `info` dictionary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash([u8; INFO_HASH_LEN]);

/// Error returned when a string is not a 40-character hex info hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid info hash")]
pub struct InvalidInfoHash {
    /// Offending input.
    pub value: String,
}

impl InfoHash {
    /// Wrap a raw digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex rendering (either case).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInfoHash`] when the input is not 40 hex characters.
    pub fn from_hex(value: &str) -> Result<Self, InvalidInfoHash> {
        let mut bytes = [0_u8; INFO_HASH_LEN];
        hex::decode_to_slice(value.trim(), &mut bytes).map_err(|_| InvalidInfoHash {
            value: value.to_string(),
        })?;
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering used as the session identity.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }
}

impl Display for InfoHash {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "InfoHash({})", self.to_hex())
    }
}

impl FromStr for InfoHash {
    type Err = InvalidInfoHash;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InvalidInfoHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.to_hex()
    }
}

/// Priority level recognized by the transfer engine.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilePriority {
    /// Do not download the file.
    Skip,
    /// Throttle the download priority.
    Low,
    /// Default priority level assigned by the engine.
    #[default]
    Normal,
    /// Highest available priority for urgent files.
    High,
}

impl FilePriority {
    /// Numeric level understood by libtorrent-style engines (0..=7).
    #[must_use]
    pub const fn engine_level(self) -> u8 {
        match self {
            Self::Skip => 0,
            Self::Low => 1,
            Self::Normal => 4,
            Self::High => 7,
        }
    }

    /// Map an engine level back to the closest priority bucket.
    #[must_use]
    pub const fn from_engine_level(level: u8) -> Self {
        match level {
            0 => Self::Skip,
            1..=3 => Self::Low,
            4..=5 => Self::Normal,
            _ => Self::High,
        }
    }
}

/// Individual file exposed by a torrent, addressed relative to the data
/// directory's parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Index of the file within the torrent metainfo.
    pub index: u32,
    /// Relative path (`/`-separated) of the file.
    pub path: String,
    /// Total size of the file in bytes.
    pub size_bytes: u64,
    /// Current priority level.
    #[serde(default)]
    pub priority: FilePriority,
}

impl FileEntry {
    /// Construct an entry with the default priority.
    #[must_use]
    pub fn new(index: u32, path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            index,
            path: path.into(),
            size_bytes,
            priority: FilePriority::Normal,
        }
    }
}

/// Lightweight transfer statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TorrentRates {
    #[serde(default)]
    /// Current payload download rate in bytes per second.
    pub download_bps: u64,
    #[serde(default)]
    /// Current payload upload rate in bytes per second.
    pub upload_bps: u64,
    #[serde(default)]
    /// Share ratio (uploaded/downloaded) reported by the engine.
    pub ratio: f64,
}

/// Aggregated progress metrics for a torrent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TorrentProgress {
    /// Total bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected for completion.
    pub bytes_total: u64,
}

impl TorrentProgress {
    #[must_use]
    /// Calculate the completion percentage (0-100).
    pub fn percent_complete(&self) -> f64 {
        if self.bytes_total == 0 {
            0.0
        } else {
            (to_f64(self.bytes_downloaded) / to_f64(self.bytes_total)) * 100.0
        }
    }
}

const fn to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "u64 to f64 conversion is required for user-facing percentage reporting"
    )]
    {
        value as f64
    }
}

/// Snapshot pushed by the engine; replaced wholesale on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TorrentStatus {
    /// Progress snapshot.
    pub progress: TorrentProgress,
    /// Transfer rates.
    pub rates: TorrentRates,
    /// All-time payload bytes uploaded.
    pub total_uploaded: u64,
    /// Peers known to the engine for this torrent.
    pub num_peers: u32,
    /// Open peer connections.
    pub num_connections: u32,
    /// Peers currently unchoked for upload.
    pub num_uploads: u32,
    /// Whether the engine has the torrent paused.
    pub paused: bool,
    /// Whether every selected file has been downloaded.
    pub finished: bool,
    /// Whether the engine schedules the torrent's queue state.
    pub auto_managed: bool,
    /// Engine-reported failure, if any.
    pub error: Option<String>,
    /// Timestamp of the snapshot.
    pub last_updated: DateTime<Utc>,
}

impl TorrentStatus {
    /// Whether the engine flagged the torrent as failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the snapshot reports 100% of the selected payload.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Completion ratio in `0.0..=1.0`.
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        self.progress.percent_complete() / 100.0
    }
}

impl Default for TorrentStatus {
    fn default() -> Self {
        Self {
            progress: TorrentProgress::default(),
            rates: TorrentRates::default(),
            total_uploaded: 0,
            num_peers: 0,
            num_connections: 0,
            num_uploads: 0,
            paused: false,
            finished: false,
            auto_managed: false,
            error: None,
            last_updated: Utc::now(),
        }
    }
}

/// Peer connected to a torrent, as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TorrentPeer {
    /// Remote `ip:port`.
    pub endpoint: String,
    /// Client identification string, when advertised.
    pub client: Option<String>,
    /// Remote completion in `0.0..=1.0`.
    pub progress: f32,
    /// Download rate from this peer in bytes per second.
    pub download_bps: u64,
    /// Upload rate to this peer in bytes per second.
    pub upload_bps: u64,
    /// Whether the remote already has the full payload.
    pub seed: bool,
}

/// Native alert categories the session distinguishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Fast-resume data was written to disk.
    SaveResumeData,
    /// Torrent storage finished moving.
    StorageMoved,
    /// A tracker announce failed.
    TrackerError,
    /// A file operation inside the engine failed.
    FileError,
    /// Any category the session does not act on.
    Other,
}

/// Asynchronous notification pushed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentAlert {
    /// Category used for dispatch.
    pub category: AlertCategory,
    /// Engine-provided detail.
    pub message: Option<String>,
}

impl TorrentAlert {
    /// Alert without a message.
    #[must_use]
    pub const fn new(category: AlertCategory) -> Self {
        Self {
            category,
            message: None,
        }
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Folder policy: active transfers live in the download folder, finished ones
/// keep their `.torrent`/`.fastresume` companions in the uploads folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderLayout {
    /// Folder holding in-progress data and companion files.
    pub download_dir: PathBuf,
    /// Folder holding companion files of finished torrents.
    pub uploads_dir: PathBuf,
}

impl FolderLayout {
    /// Construct a layout from the two folders.
    #[must_use]
    pub fn new(download_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Whether `path` sits directly inside one of the managed folders.
    #[must_use]
    pub fn is_managed(&self, path: &Path) -> bool {
        path.parent()
            .is_some_and(|parent| parent == self.download_dir || parent == self.uploads_dir)
    }

    /// `<download_dir>/<name><suffix>`.
    #[must_use]
    pub fn download_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.download_dir.join(format!("{name}{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    #[test]
    fn info_hash_parses_and_renders_lowercase() {
        let hash = InfoHash::from_hex(&HASH.to_uppercase()).expect("valid hash");
        assert_eq!(hash.to_hex(), HASH);
        assert_eq!(hash.to_string(), HASH);
        assert_eq!(format!("{hash:?}"), format!("InfoHash({HASH})"));
        assert!(InfoHash::from_hex("abc").is_err());
        assert!(InfoHash::from_hex(&"z".repeat(40)).is_err());
    }

    #[test]
    fn info_hash_serializes_as_hex_string() {
        let hash: InfoHash = HASH.parse().expect("valid hash");
        let json = serde_json::to_string(&hash).expect("serialize");
        assert_eq!(json, format!("\"{HASH}\""));
        let back: InfoHash = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<InfoHash>("\"nope\"").is_err());
    }

    #[test]
    fn file_priority_maps_engine_levels() {
        for priority in [
            FilePriority::Skip,
            FilePriority::Low,
            FilePriority::Normal,
            FilePriority::High,
        ] {
            assert_eq!(FilePriority::from_engine_level(priority.engine_level()), priority);
        }
        assert_eq!(FilePriority::from_engine_level(2), FilePriority::Low);
        assert_eq!(FilePriority::from_engine_level(6), FilePriority::High);
    }

    #[test]
    fn progress_percent_handles_zero_total() {
        let zero = TorrentProgress::default();
        assert!(zero.percent_complete().abs() < f64::EPSILON);

        let half = TorrentProgress {
            bytes_downloaded: 5,
            bytes_total: 10,
        };
        assert!((half.percent_complete() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_default_is_idle() {
        let status = TorrentStatus::default();
        assert!(!status.is_error());
        assert!(!status.is_finished());
        assert!(!status.paused);
        assert!(status.completion_ratio().abs() < f64::EPSILON);

        let failed = TorrentStatus {
            error: Some("disk full".into()),
            ..TorrentStatus::default()
        };
        assert!(failed.is_error());
    }

    #[test]
    fn folder_layout_recognises_managed_parents() {
        let layout = FolderLayout::new("/data/incomplete", "/data/torrents");
        assert!(layout.is_managed(Path::new("/data/incomplete/a.torrent")));
        assert!(layout.is_managed(Path::new("/data/torrents/a.torrent")));
        assert!(!layout.is_managed(Path::new("/home/user/a.torrent")));
        assert!(!layout.is_managed(Path::new("/data/incomplete/nested/a.torrent")));
        assert_eq!(
            layout.download_path("movie", ".fastresume"),
            PathBuf::from("/data/incomplete/movie.fastresume")
        );
    }

    #[test]
    fn alert_builder_sets_message() {
        let alert = TorrentAlert::new(AlertCategory::TrackerError).with_message("timeout");
        assert_eq!(alert.category, AlertCategory::TrackerError);
        assert_eq!(alert.message.as_deref(), Some("timeout"));
    }
}
