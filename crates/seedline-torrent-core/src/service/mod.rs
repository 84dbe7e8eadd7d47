//! Gateway traits implemented by transfer engines and consumed by sessions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use crate::model::{
    FileEntry, FilePriority, FolderLayout, InfoHash, TorrentAlert, TorrentPeer, TorrentStatus,
};

/// Callbacks the engine uses to push state into a session.
///
/// Engines invoke these from their own threads; implementations must not block.
pub trait StatusSink: Send + Sync {
    /// Replace the session's status snapshot.
    fn update_status(&self, status: TorrentStatus);

    /// Deliver a native alert.
    fn alert(&self, alert: TorrentAlert);
}

/// Everything an engine needs to admit a session.
#[derive(Clone)]
pub struct TorrentRegistration {
    /// Session identity.
    pub info_hash: InfoHash,
    /// Display name.
    pub name: String,
    /// Engine-visible `.torrent` file.
    pub torrent_file: PathBuf,
    /// Resume data location.
    pub fast_resume_file: PathBuf,
    /// Download target.
    pub data_path: PathBuf,
    /// Receiver for status snapshots and alerts.
    pub sink: Arc<dyn StatusSink>,
}

impl fmt::Debug for TorrentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorrentRegistration")
            .field("info_hash", &self.info_hash)
            .field("name", &self.name)
            .field("torrent_file", &self.torrent_file)
            .field("fast_resume_file", &self.fast_resume_file)
            .field("data_path", &self.data_path)
            .finish_non_exhaustive()
    }
}

/// Boundary to the transfer engine (peer protocol, piece I/O).
#[async_trait]
pub trait EngineGateway: Send + Sync {
    /// Whether the engine is loaded and able to accept work.
    fn is_valid(&self) -> bool;

    /// Default download/upload folders from the engine settings.
    fn folders(&self) -> FolderLayout;

    /// Admit a session; the engine pushes status through `registration.sink`.
    async fn register_torrent(&self, registration: TorrentRegistration) -> anyhow::Result<()>;

    /// Drop a session from the engine.
    async fn remove_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()>;

    /// Pause a torrent; default implementation reports lack of support.
    async fn pause_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        let _ = info_hash;
        bail!("pause operation not supported by this engine");
    }

    /// Resume a torrent; default implementation reports lack of support.
    async fn resume_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        let _ = info_hash;
        bail!("resume operation not supported by this engine");
    }

    /// Re-admit a torrent whose engine state failed.
    async fn recover_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        let _ = info_hash;
        bail!("recover operation not supported by this engine");
    }

    /// Move torrent storage into `directory`.
    async fn move_torrent(&self, info_hash: &InfoHash, directory: &Path) -> anyhow::Result<()> {
        let _ = (info_hash, directory);
        bail!("move not supported by this engine");
    }

    /// Toggle engine-managed queueing.
    async fn set_auto_managed(&self, info_hash: &InfoHash, auto_managed: bool) -> anyhow::Result<()> {
        let _ = (info_hash, auto_managed);
        bail!("auto-managed toggle not supported by this engine");
    }

    /// Change the priority of a single file.
    async fn set_file_entry_priority(
        &self,
        info_hash: &InfoHash,
        entry: &FileEntry,
        priority: FilePriority,
    ) -> anyhow::Result<()> {
        let _ = (info_hash, entry, priority);
        bail!("file priority updates not supported by this engine");
    }

    /// Live file listing.
    async fn file_entries(&self, info_hash: &InfoHash) -> anyhow::Result<Vec<FileEntry>> {
        let _ = info_hash;
        bail!("file inspection not supported by this engine");
    }

    /// Retrieve connected peers for a torrent.
    async fn peers(&self, info_hash: &InfoHash) -> anyhow::Result<Vec<TorrentPeer>> {
        let _ = info_hash;
        bail!("peer inspection not supported by this engine");
    }
}
