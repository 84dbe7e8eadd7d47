//! The per-torrent state machine.
//!
//! Engine callbacks (`update_status`, `alert`) and user-driven transitions
//! share one coarse lock over [`SessionState`], so the completion flag always
//! matches the snapshot that set it. Events are enqueued on the multicaster
//! while that lock is held; enqueueing never waits on listener code, and doing
//! it under the lock keeps every listener's view in snapshot order.
//!
//! `start`, `stop` and `move_to` await the engine, so they additionally run
//! one at a time under an async transition lock. A `stop` issued while the
//! engine is still resuming or moving the torrent takes effect after that
//! call returns.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use seedline_events::{EventListener, EventMulticaster, EventStream, ListenerId, TorrentEvent};
use seedline_fsops::{FileEntryManager, PlaceholderReport, copy_file, relocate_companions, remove_files};
use seedline_torrent_core::{
    AlertCategory, EngineGateway, FileEntry, FilePriority, InfoHash, StatusSink, TorrentAlert,
    TorrentMetaInfo, TorrentPeer, TorrentRegistration, TorrentStatus,
};
use tracing::{debug, info, trace, warn};

use crate::error::{SessionError, SessionResult};
use crate::params::{SessionIdentity, SessionParams, SessionPaths};

/// Coarse lifecycle position derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    /// Created but never started.
    Initialized,
    /// Handed to the engine and not paused.
    Started,
    /// Started, with the latest snapshot reporting a pause.
    Paused,
    /// Cancelled; terminal.
    Stopped,
}

#[derive(Debug)]
struct SessionState {
    started: bool,
    cancelled: bool,
    complete: bool,
    status: Option<TorrentStatus>,
    meta_info: Option<Arc<TorrentMetaInfo>>,
    paths: SessionPaths,
}

/// A single torrent's lifecycle, bridging engine callbacks to listeners.
pub struct TorrentSession {
    identity: SessionIdentity,
    engine: Arc<dyn EngineGateway>,
    events: EventMulticaster,
    state: Mutex<SessionState>,
    transitions: tokio::sync::Mutex<()>,
}

impl TorrentSession {
    /// Resolve `params` and build a session. Metadata decoded from the
    /// `.torrent` file seeds the cache without firing an event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Initialization`] when name, info hash or the
    /// download folder stay unresolved, and [`SessionError::Decode`] /
    /// [`SessionError::Io`] when an existing `.torrent` cannot be read.
    pub fn init(
        params: SessionParams,
        engine: Arc<dyn EngineGateway>,
        events: EventMulticaster,
    ) -> SessionResult<Arc<Self>> {
        let resolved = params.resolve(&engine.folders())?;
        debug!(
            info_hash = %resolved.identity.info_hash,
            name = %resolved.identity.name,
            data_path = %resolved.paths.data_path.display(),
            "session initialized"
        );
        Ok(Arc::new(Self {
            identity: resolved.identity,
            engine,
            events,
            state: Mutex::new(SessionState {
                started: false,
                cancelled: false,
                complete: false,
                status: None,
                meta_info: resolved.meta_info.map(Arc::new),
                paths: resolved.paths,
            }),
            transitions: tokio::sync::Mutex::new(()),
        }))
    }

    /// Content identifier.
    #[must_use]
    pub const fn info_hash(&self) -> InfoHash {
        self.identity.info_hash
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Tracker announce URL, when known.
    #[must_use]
    pub fn tracker_url(&self) -> Option<&str> {
        self.identity.tracker_url.as_deref()
    }

    /// Whether the torrent is private.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.identity.private
    }

    /// Immutable identity resolved at init.
    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Current `.torrent` location.
    #[must_use]
    pub fn torrent_file(&self) -> PathBuf {
        self.lock_state().paths.torrent_file.clone()
    }

    /// Current fast-resume location.
    #[must_use]
    pub fn fast_resume_file(&self) -> PathBuf {
        self.lock_state().paths.fast_resume_file.clone()
    }

    /// Current download target.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.lock_state().paths.data_path.clone()
    }

    /// On-disk location of a file entry: the data path's parent joined with
    /// the entry's relative path.
    #[must_use]
    pub fn data_file_for(&self, entry: &FileEntry) -> PathBuf {
        self.entry_root().join(&entry.path)
    }

    fn entry_root(&self) -> PathBuf {
        self.data_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Hand the session to the engine. A no-op when already started.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`, or the engine failure;
    /// on failure the session is left unstarted so a later call may retry.
    pub async fn start(&self) -> SessionResult<()> {
        let _transition = self.transitions.lock().await;
        {
            let state = self.lock_state();
            if state.cancelled {
                return Err(self.cancelled());
            }
            if state.started {
                return Ok(());
            }
        }
        self.resume().await?;
        self.lock_state().started = true;
        info!(info_hash = %self.identity.info_hash, name = %self.identity.name, "session started");
        self.events.broadcast(TorrentEvent::Started {
            info_hash: self.hex(),
        });
        Ok(())
    }

    /// Resume transfer, or ask the engine to recover when the latest snapshot
    /// carries an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`, or the engine failure.
    pub async fn resume(&self) -> SessionResult<()> {
        let failed = {
            let state = self.lock_state();
            if state.cancelled {
                return Err(self.cancelled());
            }
            state.status.as_ref().is_some_and(TorrentStatus::is_error)
        };
        let hash = self.identity.info_hash;
        if failed {
            info!(info_hash = %hash, "recovering failed session");
            self.engine
                .recover_torrent(&hash)
                .await
                .map_err(|err| SessionError::engine("recover_torrent", hash, err))
        } else {
            info!(info_hash = %hash, "resuming session");
            self.engine
                .resume_torrent(&hash)
                .await
                .map_err(|err| SessionError::engine("resume_torrent", hash, err))
        }
    }

    /// Ask the engine to pause.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`, or the engine failure.
    pub async fn pause(&self) -> SessionResult<()> {
        self.ensure_active()?;
        let hash = self.identity.info_hash;
        info!(info_hash = %hash, "pausing session");
        self.engine
            .pause_torrent(&hash)
            .await
            .map_err(|err| SessionError::engine("pause_torrent", hash, err))
    }

    /// Toggle engine-managed queueing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`, or the engine failure.
    pub async fn set_auto_managed(&self, auto_managed: bool) -> SessionResult<()> {
        self.ensure_active()?;
        let hash = self.identity.info_hash;
        self.engine
            .set_auto_managed(&hash, auto_managed)
            .await
            .map_err(|err| SessionError::engine("set_auto_managed", hash, err))
    }

    /// Change one file's download priority.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`, or the engine failure.
    pub async fn set_file_entry_priority(
        &self,
        entry: &FileEntry,
        priority: FilePriority,
    ) -> SessionResult<()> {
        self.ensure_active()?;
        let hash = self.identity.info_hash;
        self.engine
            .set_file_entry_priority(&hash, entry, priority)
            .await
            .map_err(|err| SessionError::engine("set_file_entry_priority", hash, err))
    }

    /// Cancel the session. Only the first call has any effect: it removes the
    /// torrent from the engine when it had been started and always emits
    /// `Stopped`. Waits for an in-flight `start` or `move_to` to finish.
    ///
    /// # Errors
    ///
    /// Returns the engine's removal failure; the session is cancelled and
    /// `Stopped` is emitted regardless.
    pub async fn stop(&self) -> SessionResult<()> {
        let _transition = self.transitions.lock().await;
        let was_started = {
            let mut state = self.lock_state();
            if state.cancelled {
                return Ok(());
            }
            state.cancelled = true;
            state.started
        };
        let hash = self.identity.info_hash;
        let removal = if was_started {
            self.engine
                .remove_torrent(&hash)
                .await
                .map_err(|err| SessionError::engine("remove_torrent", hash, err))
        } else {
            Ok(())
        };
        info!(info_hash = %hash, was_started, "session stopped");
        self.events.broadcast(TorrentEvent::Stopped { info_hash: self.hex() });
        removal
    }

    /// Replace the status snapshot. Ignored once cancelled.
    ///
    /// The first snapshot reporting completion flips `complete` and emits
    /// `Completed`; every other accepted snapshot emits `StatusChanged`.
    /// `complete` never reverts.
    pub fn update_status(&self, status: TorrentStatus) {
        let mut state = self.lock_state();
        if state.cancelled {
            trace!(info_hash = %self.identity.info_hash, "status dropped after cancellation");
            return;
        }
        let newly_complete = !state.complete && status.is_finished();
        state.complete |= newly_complete;
        state.status = Some(status);
        let info_hash = self.hex();
        if newly_complete {
            info!(info_hash = %info_hash, "session complete");
            self.events.broadcast(TorrentEvent::Completed { info_hash });
        } else {
            self.events.broadcast(TorrentEvent::StatusChanged { info_hash });
        }
    }

    /// Handle a native alert. Ignored once cancelled.
    pub fn alert(&self, alert: TorrentAlert) {
        let state = self.lock_state();
        if state.cancelled {
            trace!(info_hash = %self.identity.info_hash, "alert dropped after cancellation");
            return;
        }
        match alert.category {
            AlertCategory::SaveResumeData => {
                self.events.broadcast(TorrentEvent::FastResumeFileSaved {
                    info_hash: self.hex(),
                });
            }
            category => {
                debug!(
                    info_hash = %self.identity.info_hash,
                    ?category,
                    message = alert.message.as_deref().unwrap_or_default(),
                    "unhandled alert"
                );
            }
        }
        drop(state);
    }

    /// Store late-arriving metadata. Only the first call stores and emits
    /// `MetadataUpdated`; returns whether this call did.
    pub fn set_meta_info(&self, meta_info: TorrentMetaInfo) -> bool {
        let mut state = self.lock_state();
        if state.cancelled || state.meta_info.is_some() {
            return false;
        }
        state.meta_info = Some(Arc::new(meta_info));
        self.events.broadcast(TorrentEvent::MetadataUpdated {
            info_hash: self.hex(),
        });
        true
    }

    /// Cached metadata, if known.
    #[must_use]
    pub fn meta_info(&self) -> Option<Arc<TorrentMetaInfo>> {
        self.lock_state().meta_info.clone()
    }

    /// Whether metadata is known.
    #[must_use]
    pub fn has_meta_data(&self) -> bool {
        self.lock_state().meta_info.is_some()
    }

    /// Multi-file layout according to cached metadata.
    #[must_use]
    pub fn is_multi_file_torrent(&self) -> bool {
        self.lock_state()
            .meta_info
            .as_ref()
            .is_some_and(|meta| meta.is_multi_file())
    }

    /// Inverse of [`Self::is_multi_file_torrent`].
    #[must_use]
    pub fn is_single_file_torrent(&self) -> bool {
        !self.is_multi_file_torrent()
    }

    /// Relocate a finished download into `directory`. The engine moves the
    /// data; the `.torrent` and fast-resume files are copied into the uploads
    /// folder, the bindings updated, and only then the originals deleted.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFinished`] unless the latest snapshot is finished.
    /// - [`SessionError::Cancelled`] after `stop`.
    /// - [`SessionError::Engine`] when the engine refuses the move.
    /// - [`SessionError::Relocation`] when a copy or delete fails part way;
    ///   files may then exist in both places.
    pub async fn move_to(&self, directory: &Path) -> SessionResult<()> {
        let _transition = self.transitions.lock().await;
        let hash = self.identity.info_hash;
        {
            let state = self.lock_state();
            if state.cancelled {
                return Err(self.cancelled());
            }
            if !state.status.as_ref().is_some_and(TorrentStatus::is_finished) {
                return Err(SessionError::NotFinished { info_hash: hash });
            }
        }

        self.engine
            .move_torrent(&hash, directory)
            .await
            .map_err(|err| SessionError::engine("move_torrent", hash, err))?;

        let (torrent_file, fast_resume_file) = {
            let mut state = self.lock_state();
            if let Some(file_name) = state.paths.data_path.file_name() {
                state.paths.data_path = directory.join(file_name);
            }
            (
                state.paths.torrent_file.clone(),
                state.paths.fast_resume_file.clone(),
            )
        };
        info!(info_hash = %hash, directory = %directory.display(), "session data moved");

        let uploads = self.engine.folders().uploads_dir;
        let copied = relocate_companions(&[torrent_file.as_path(), fast_resume_file.as_path()], &uploads)
            .map_err(|source| SessionError::Relocation {
                info_hash: hash,
                source,
            })?;
        {
            let mut state = self.lock_state();
            for file in &copied {
                if state.paths.torrent_file == file.from {
                    state.paths.torrent_file.clone_from(&file.to);
                } else if state.paths.fast_resume_file == file.from {
                    state.paths.fast_resume_file.clone_from(&file.to);
                }
            }
        }
        let originals: Vec<PathBuf> = copied.into_iter().map(|file| file.from).collect();
        remove_files(&originals).map_err(|source| SessionError::Relocation {
            info_hash: hash,
            source,
        })?;
        info!(info_hash = %hash, uploads = %uploads.display(), "session companions relocated");
        Ok(())
    }

    /// Register with the engine. Returns `Ok(false)` when the engine is not
    /// valid. A `.torrent` living outside the managed folders is first copied
    /// into the download folder so the engine's copy cannot be deleted from
    /// under it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] after `stop`,
    /// [`SessionError::Filesystem`] when the copy fails, or the engine failure.
    pub async fn register_with_engine(self: &Arc<Self>) -> SessionResult<bool> {
        let hash = self.identity.info_hash;
        self.ensure_active()?;
        if !self.engine.is_valid() {
            warn!(info_hash = %hash, "engine unavailable; registration deferred");
            return Ok(false);
        }

        let folders = self.engine.folders();
        let torrent_file = self.torrent_file();
        if !folders.is_managed(&torrent_file) && torrent_file.exists() {
            let target = folders.download_path(&self.identity.name, ".torrent");
            copy_file(&torrent_file, &target).map_err(|source| SessionError::Filesystem {
                operation: "register.copy_torrent",
                source,
            })?;
            info!(
                info_hash = %hash,
                from = %torrent_file.display(),
                to = %target.display(),
                "torrent file copied into download folder"
            );
            self.lock_state().paths.torrent_file = target;
        }

        let registration = {
            let state = self.lock_state();
            TorrentRegistration {
                info_hash: hash,
                name: self.identity.name.clone(),
                torrent_file: state.paths.torrent_file.clone(),
                fast_resume_file: state.paths.fast_resume_file.clone(),
                data_path: state.paths.data_path.clone(),
                sink: Arc::new(SessionSink(Arc::downgrade(self))),
            }
        };
        self.engine
            .register_torrent(registration)
            .await
            .map_err(|err| SessionError::engine("register_torrent", hash, err))?;
        info!(info_hash = %hash, "session registered with engine");
        Ok(true)
    }

    /// File entries: live from the engine while active, from cached metadata
    /// once cancelled (empty when metadata never arrived).
    ///
    /// # Errors
    ///
    /// Returns the engine failure while active.
    pub async fn get_torrent_file_entries(&self) -> SessionResult<Vec<FileEntry>> {
        let cached = {
            let state = self.lock_state();
            state.cancelled.then(|| {
                state
                    .meta_info
                    .as_ref()
                    .map(|meta| meta.files.clone())
                    .unwrap_or_default()
            })
        };
        if let Some(entries) = cached {
            return Ok(entries);
        }
        let hash = self.identity.info_hash;
        self.engine
            .file_entries(&hash)
            .await
            .map_err(|err| SessionError::engine("file_entries", hash, err))
    }

    /// Peers currently known to the engine.
    ///
    /// # Errors
    ///
    /// Returns the engine failure.
    pub async fn get_torrent_peers(&self) -> SessionResult<Vec<TorrentPeer>> {
        let hash = self.identity.info_hash;
        self.engine
            .peers(&hash)
            .await
            .map_err(|err| SessionError::engine("peers", hash, err))
    }

    /// Create an empty placeholder for every file entry that is missing on
    /// disk. Individual failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the engine failure when the entry listing cannot be fetched.
    pub async fn init_files(&self) -> SessionResult<PlaceholderReport> {
        let entries = self.get_torrent_file_entries().await?;
        let manager = FileEntryManager::new(self.entry_root());
        Ok(manager.ensure_placeholders(&entries))
    }

    /// Latest status snapshot.
    #[must_use]
    pub fn status(&self) -> Option<TorrentStatus> {
        self.lock_state().status.clone()
    }

    fn with_status<T: Default>(&self, read: impl FnOnce(&TorrentStatus) -> T) -> T {
        self.lock_state()
            .status
            .as_ref()
            .map(read)
            .unwrap_or_default()
    }

    /// Payload download rate in bytes per second.
    #[must_use]
    pub fn download_rate(&self) -> u64 {
        self.with_status(|status| status.rates.download_bps)
    }

    /// Payload upload rate in bytes per second.
    #[must_use]
    pub fn upload_rate(&self) -> u64 {
        self.with_status(|status| status.rates.upload_bps)
    }

    /// Peers known to the engine.
    #[must_use]
    pub fn num_peers(&self) -> u32 {
        self.with_status(|status| status.num_peers)
    }

    /// Open connections.
    #[must_use]
    pub fn num_connections(&self) -> u32 {
        self.with_status(|status| status.num_connections)
    }

    /// Unchoked upload slots.
    #[must_use]
    pub fn num_uploads(&self) -> u32 {
        self.with_status(|status| status.num_uploads)
    }

    /// All-time payload bytes uploaded.
    #[must_use]
    pub fn total_uploaded(&self) -> u64 {
        self.with_status(|status| status.total_uploaded)
    }

    /// Share ratio.
    #[must_use]
    pub fn seed_ratio(&self) -> f64 {
        self.with_status(|status| status.rates.ratio)
    }

    /// Whether the latest snapshot is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.with_status(|status| status.paused)
    }

    /// Whether the latest snapshot is finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.with_status(TorrentStatus::is_finished)
    }

    /// Whether the latest snapshot is engine-managed.
    #[must_use]
    pub fn is_auto_managed(&self) -> bool {
        self.with_status(|status| status.auto_managed)
    }

    /// Whether `start` has succeeded.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.lock_state().started
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lock_state().cancelled
    }

    /// Whether a completed snapshot has ever been seen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lock_state().complete
    }

    /// Current lifecycle position.
    #[must_use]
    pub fn lifecycle(&self) -> SessionLifecycle {
        let state = self.lock_state();
        if state.cancelled {
            SessionLifecycle::Stopped
        } else if !state.started {
            SessionLifecycle::Initialized
        } else if state.status.as_ref().is_some_and(|status| status.paused) {
            SessionLifecycle::Paused
        } else {
            SessionLifecycle::Started
        }
    }

    /// Register a callback listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        self.events.add_listener(listener)
    }

    /// Remove a listener; already-queued events may still be delivered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Subscribe to this session's events as a stream.
    #[must_use]
    pub fn subscribe(&self) -> (ListenerId, EventStream) {
        self.events.subscribe()
    }

    fn ensure_active(&self) -> SessionResult<()> {
        if self.lock_state().cancelled {
            Err(self.cancelled())
        } else {
            Ok(())
        }
    }

    const fn cancelled(&self) -> SessionError {
        SessionError::Cancelled {
            info_hash: self.identity.info_hash,
        }
    }

    fn hex(&self) -> String {
        self.identity.info_hash.to_hex()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusSink for TorrentSession {
    fn update_status(&self, status: TorrentStatus) {
        Self::update_status(self, status);
    }

    fn alert(&self, alert: TorrentAlert) {
        Self::alert(self, alert);
    }
}

impl fmt::Debug for TorrentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorrentSession")
            .field("identity", &self.identity)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

/// Engine-held handle; does not keep the session alive.
struct SessionSink(Weak<TorrentSession>);

impl StatusSink for SessionSink {
    fn update_status(&self, status: TorrentStatus) {
        if let Some(session) = self.0.upgrade() {
            session.update_status(status);
        }
    }

    fn alert(&self, alert: TorrentAlert) {
        if let Some(session) = self.0.upgrade() {
            session.alert(alert);
        }
    }
}
