//! In-memory engine gateway for deterministic session tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::bail;
use async_trait::async_trait;
use seedline_fsops::move_tree;
use seedline_torrent_core::{
    EngineGateway, FileEntry, FilePriority, FolderLayout, InfoHash, TorrentAlert,
    TorrentPeer, TorrentRegistration, TorrentStatus,
};
use tokio::sync::Notify;

/// Gateway call recorded by [`FakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// `register_torrent`
    Register(InfoHash),
    /// `remove_torrent`
    Remove(InfoHash),
    /// `pause_torrent`
    Pause(InfoHash),
    /// `resume_torrent`
    Resume(InfoHash),
    /// `recover_torrent`
    Recover(InfoHash),
    /// `move_torrent`
    Move(InfoHash, PathBuf),
    /// `set_auto_managed`
    AutoManaged(InfoHash, bool),
    /// `set_file_entry_priority` with the entry index
    Priority(InfoHash, u32, FilePriority),
    /// `file_entries`
    FileEntries(InfoHash),
    /// `peers`
    Peers(InfoHash),
}

/// Pause point armed by [`FakeEngine::hold`].
///
/// The held operation signals `entered` and then waits for `open` before it
/// records the call and takes effect.
#[derive(Debug, Default)]
pub struct EngineGate {
    entered: Notify,
    release: Notify,
}

impl EngineGate {
    /// Wait until the held operation is blocked on this gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held operation continue.
    pub fn open(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    registrations: HashMap<InfoHash, TorrentRegistration>,
    failures: HashSet<&'static str>,
    gates: HashMap<&'static str, Arc<EngineGate>>,
    file_entries: Vec<FileEntry>,
    peers: Vec<TorrentPeer>,
}

/// Engine double: records calls, keeps registrations, pushes callbacks on
/// demand and moves data on `move_torrent`.
pub struct FakeEngine {
    folders: FolderLayout,
    valid: AtomicBool,
    state: Mutex<EngineState>,
}

impl FakeEngine {
    /// Valid engine using `folders`.
    #[must_use]
    pub fn new(folders: FolderLayout) -> Self {
        Self {
            folders,
            valid: AtomicBool::new(true),
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Flip the value returned by `is_valid`.
    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    /// Make the next call to `operation` fail.
    pub fn fail_next(&self, operation: &'static str) {
        self.lock().failures.insert(operation);
    }

    /// Block the next call to `operation` until the returned gate opens.
    #[must_use]
    pub fn hold(&self, operation: &'static str) -> Arc<EngineGate> {
        let gate = Arc::new(EngineGate::default());
        self.lock().gates.insert(operation, Arc::clone(&gate));
        gate
    }

    /// Entries returned by `file_entries`.
    pub fn set_file_entries(&self, entries: Vec<FileEntry>) {
        self.lock().file_entries = entries;
    }

    /// Peers returned by `peers`.
    pub fn set_peers(&self, peers: Vec<TorrentPeer>) {
        self.lock().peers = peers;
    }

    /// Every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Registration held for `info_hash`.
    #[must_use]
    pub fn registration(&self, info_hash: &InfoHash) -> Option<TorrentRegistration> {
        self.lock().registrations.get(info_hash).cloned()
    }

    /// Number of registered torrents.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Deliver `status` to the registered sink. Returns whether a sink existed.
    pub fn push_status(&self, info_hash: &InfoHash, status: TorrentStatus) -> bool {
        let Some(registration) = self.registration(info_hash) else {
            return false;
        };
        registration.sink.update_status(status);
        true
    }

    /// Deliver `alert` to the registered sink. Returns whether a sink existed.
    pub fn push_alert(&self, info_hash: &InfoHash, alert: TorrentAlert) -> bool {
        let Some(registration) = self.registration(info_hash) else {
            return false;
        };
        registration.sink.alert(alert);
        true
    }

    async fn record(&self, operation: &'static str, call: EngineCall) -> anyhow::Result<()> {
        let gate = self.lock().gates.remove(operation);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut state = self.lock();
        if state.failures.remove(operation) {
            bail!("injected {operation} failure");
        }
        state.calls.push(call);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EngineGateway for FakeEngine {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn folders(&self) -> FolderLayout {
        self.folders.clone()
    }

    async fn register_torrent(&self, registration: TorrentRegistration) -> anyhow::Result<()> {
        let info_hash = registration.info_hash;
        self.record("register_torrent", EngineCall::Register(info_hash)).await?;
        self.lock().registrations.insert(info_hash, registration);
        Ok(())
    }

    async fn remove_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        self.record("remove_torrent", EngineCall::Remove(*info_hash)).await?;
        self.lock().registrations.remove(info_hash);
        Ok(())
    }

    async fn pause_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        self.record("pause_torrent", EngineCall::Pause(*info_hash)).await
    }

    async fn resume_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        self.record("resume_torrent", EngineCall::Resume(*info_hash)).await
    }

    async fn recover_torrent(&self, info_hash: &InfoHash) -> anyhow::Result<()> {
        self.record("recover_torrent", EngineCall::Recover(*info_hash)).await
    }

    async fn move_torrent(&self, info_hash: &InfoHash, directory: &Path) -> anyhow::Result<()> {
        self.record(
            "move_torrent",
            EngineCall::Move(*info_hash, directory.to_path_buf()),
        )
        .await?;
        let Some(current) = self
            .registration(info_hash)
            .map(|registration| registration.data_path)
        else {
            return Ok(());
        };
        let Some(file_name) = current.file_name() else {
            bail!("data path has no file name");
        };
        let target = directory.join(file_name);
        if current.exists() {
            move_tree(&current, &target)?;
        }
        if let Some(registration) = self.lock().registrations.get_mut(info_hash) {
            registration.data_path = target;
        }
        Ok(())
    }

    async fn set_auto_managed(&self, info_hash: &InfoHash, auto_managed: bool) -> anyhow::Result<()> {
        self.record(
            "set_auto_managed",
            EngineCall::AutoManaged(*info_hash, auto_managed),
        )
        .await
    }

    async fn set_file_entry_priority(
        &self,
        info_hash: &InfoHash,
        entry: &FileEntry,
        priority: FilePriority,
    ) -> anyhow::Result<()> {
        self.record(
            "set_file_entry_priority",
            EngineCall::Priority(*info_hash, entry.index, priority),
        )
        .await
    }

    async fn file_entries(&self, info_hash: &InfoHash) -> anyhow::Result<Vec<FileEntry>> {
        self.record("file_entries", EngineCall::FileEntries(*info_hash)).await?;
        Ok(self.lock().file_entries.clone())
    }

    async fn peers(&self, info_hash: &InfoHash) -> anyhow::Result<Vec<TorrentPeer>> {
        self.record("peers", EngineCall::Peers(*info_hash)).await?;
        Ok(self.lock().peers.clone())
    }
}
