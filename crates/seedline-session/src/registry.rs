//! Registry of live sessions keyed by info hash.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seedline_events::EventMulticaster;
use seedline_torrent_core::{EngineGateway, InfoHash};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::params::SessionParams;
use crate::session::TorrentSession;

#[derive(Default)]
struct RegistryState {
    active: HashMap<InfoHash, Arc<TorrentSession>>,
    pending: HashSet<InfoHash>,
}

/// Tracks every registered session and enforces one per info hash.
///
/// A session stopped outside the registry no longer counts as live: lookups
/// skip it and a new registration for its hash replaces it.
///
/// Constructed explicitly by the application and shared by reference.
pub struct SessionRegistry {
    engine: Arc<dyn EngineGateway>,
    runtime: Handle,
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    /// Registry bound to `engine`; session listener tasks run on `runtime`.
    #[must_use]
    pub fn new(engine: Arc<dyn EngineGateway>, runtime: Handle) -> Self {
        Self {
            engine,
            runtime,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Engine shared by every session in the registry.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn EngineGateway> {
        &self.engine
    }

    /// Initialise a session against this registry's engine. The session is
    /// not registered until [`Self::register`] succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the session's initialization failure.
    pub fn create_session(&self, params: SessionParams) -> SessionResult<Arc<TorrentSession>> {
        TorrentSession::init(
            params,
            Arc::clone(&self.engine),
            EventMulticaster::new(self.runtime.clone()),
        )
    }

    /// Register `session` with the engine and track it.
    ///
    /// The info hash is reserved before the engine call so a concurrent
    /// registration of the same hash is rejected even while this one is in
    /// flight.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DuplicateSession`] when the hash is live or pending.
    /// - [`SessionError::Cancelled`] when `session` itself was stopped.
    /// - [`SessionError::EngineUnavailable`] when the engine is not valid.
    /// - Any failure from [`TorrentSession::register_with_engine`].
    pub async fn register(&self, session: &Arc<TorrentSession>) -> SessionResult<()> {
        let info_hash = session.info_hash();
        let reservation = self.reserve(info_hash)?;

        let registered = session.register_with_engine().await?;
        if !registered {
            return Err(SessionError::EngineUnavailable { info_hash });
        }

        let count = {
            let mut state = self.lock_state();
            state.active.insert(info_hash, Arc::clone(session));
            state.active.len()
        };
        drop(reservation);
        info!(info_hash = %info_hash, sessions = count, "session registered");
        Ok(())
    }

    /// Live session for `info_hash`.
    #[must_use]
    pub fn lookup(&self, info_hash: &InfoHash) -> Option<Arc<TorrentSession>> {
        self.lock_state()
            .active
            .get(info_hash)
            .filter(|session| !session.is_cancelled())
            .cloned()
    }

    /// Remove and stop the session for `info_hash`. Returns the removed
    /// session, if any.
    ///
    /// # Errors
    ///
    /// Returns the session's stop failure; the session is removed regardless.
    pub async fn unregister(&self, info_hash: &InfoHash) -> SessionResult<Option<Arc<TorrentSession>>> {
        let removed = self.lock_state().active.remove(info_hash);
        let Some(session) = removed else {
            return Ok(None);
        };
        info!(info_hash = %info_hash, "session unregistered");
        session.stop().await?;
        Ok(Some(session))
    }

    /// Drop sessions that were stopped outside the registry.
    pub fn prune_cancelled(&self) -> usize {
        let mut state = self.lock_state();
        let before = state.active.len();
        state.active.retain(|_, session| !session.is_cancelled());
        let pruned = before - state.active.len();
        if pruned > 0 {
            debug!(pruned, "cancelled sessions pruned");
        }
        pruned
    }

    /// Snapshot of live sessions.
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<TorrentSession>> {
        self.lock_state()
            .active
            .values()
            .filter(|session| !session.is_cancelled())
            .cloned()
            .collect()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state()
            .active
            .values()
            .filter(|session| !session.is_cancelled())
            .count()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reserve(&self, info_hash: InfoHash) -> SessionResult<Reservation<'_>> {
        let mut state = self.lock_state();
        match state.active.get(&info_hash).map(|existing| existing.is_cancelled()) {
            Some(true) => {
                state.active.remove(&info_hash);
                debug!(info_hash = %info_hash, "stopped session evicted");
            }
            Some(false) => return Err(SessionError::DuplicateSession { info_hash }),
            None => {}
        }
        if !state.pending.insert(info_hash) {
            return Err(SessionError::DuplicateSession { info_hash });
        }
        Ok(Reservation {
            registry: self,
            info_hash,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("SessionRegistry")
            .field("active", &state.active.len())
            .field("pending", &state.pending.len())
            .finish_non_exhaustive()
    }
}

/// Pending-hash reservation, released on drop even if registration is
/// abandoned mid-flight.
struct Reservation<'a> {
    registry: &'a SessionRegistry,
    info_hash: InfoHash,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.lock_state().pending.remove(&self.info_hash);
    }
}
