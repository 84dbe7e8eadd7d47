//! Asynchronous per-listener fan-out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{EventsError, EventsResult};
use crate::payloads::{EventEnvelope, EventId, TorrentEvent};

/// Stream handed to async subscribers.
pub type EventStream = UnboundedReceiverStream<EventEnvelope>;

/// Callback invoked once per delivered event, on a runtime task.
pub trait EventListener: Send + Sync + 'static {
    /// Handle a single event.
    fn handle_event(&self, envelope: &EventEnvelope);
}

impl<F> EventListener for F
where
    F: Fn(&EventEnvelope) + Send + Sync + 'static,
{
    fn handle_event(&self, envelope: &EventEnvelope) {
        self(envelope);
    }
}

/// Handle returned on registration, used to remove the listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

struct Slot {
    id: ListenerId,
    sender: UnboundedSender<EventEnvelope>,
}

struct Shared {
    slots: Mutex<Vec<Slot>>,
    next_id: AtomicU64,
}

/// Fan-out hub: `broadcast` enqueues and returns immediately.
///
/// Removal is best-effort: events already queued for a removed listener may
/// still be delivered.
#[derive(Clone)]
pub struct EventMulticaster {
    runtime: Handle,
    shared: Arc<Shared>,
}

impl EventMulticaster {
    /// Construct a multicaster whose listener tasks run on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            shared: Arc::new(Shared {
                slots: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Construct a multicaster bound to the ambient tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::RuntimeUnavailable`] outside a runtime context.
    pub fn from_current() -> EventsResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| EventsError::RuntimeUnavailable {
                operation: "multicaster.from_current",
            })
    }

    /// Register a callback listener served by a dedicated drain task.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EventEnvelope>();
        let id = self.insert(sender);
        self.runtime.spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                listener.handle_event(&envelope);
            }
            trace!(listener = %id, "listener drained");
        });
        id
    }

    /// Register a stream subscriber.
    #[must_use]
    pub fn subscribe(&self) -> (ListenerId, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.insert(sender);
        (id, UnboundedReceiverStream::new(receiver))
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut slots = self.lock_slots();
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        before != slots.len()
    }

    /// Enqueue `event` for every listener without waiting on any of them.
    pub fn broadcast(&self, event: TorrentEvent) -> EventId {
        let mut slots = self.lock_slots();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        slots.retain(|slot| {
            let delivered = slot.sender.send(envelope.clone()).is_ok();
            if !delivered {
                debug!(listener = %slot.id, "dropping closed listener");
            }
            delivered
        });
        trace!(
            event_id = id,
            event_kind = envelope.event.kind(),
            listeners = slots.len(),
            "event broadcast"
        );
        id
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock_slots().len()
    }

    fn insert(&self, sender: UnboundedSender<EventEnvelope>) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.lock_slots().push(Slot { id, sender });
        id
    }

    fn lock_slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventMulticaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMulticaster")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    const WAIT: Duration = Duration::from_secs(1);

    fn status(n: usize) -> TorrentEvent {
        TorrentEvent::StatusChanged {
            info_hash: format!("{n:040x}"),
        }
    }

    fn forwarding_listener() -> (Arc<dyn EventListener>, UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn EventListener> = Arc::new(move |envelope: &EventEnvelope| {
            let _ = tx.send(envelope.clone());
        });
        (listener, rx)
    }

    #[tokio::test]
    async fn delivers_in_broadcast_order_per_listener() {
        let hub = EventMulticaster::from_current().expect("runtime");
        let (first, mut first_rx) = forwarding_listener();
        let (second, mut second_rx) = forwarding_listener();
        hub.add_listener(first);
        hub.add_listener(second);

        let ids: Vec<_> = (0..100).map(|n| hub.broadcast(status(n))).collect();

        for rx in [&mut first_rx, &mut second_rx] {
            let mut seen = Vec::new();
            while seen.len() < ids.len() {
                let envelope = timeout(WAIT, rx.recv())
                    .await
                    .expect("delivery timed out")
                    .expect("listener closed");
                seen.push(envelope.id);
            }
            assert_eq!(seen, ids);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn broadcast_does_not_wait_for_slow_listeners() {
        let hub = EventMulticaster::from_current().expect("runtime");
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.add_listener(Arc::new(move |envelope: &EventEnvelope| {
            std::thread::sleep(Duration::from_millis(50));
            let _ = tx.send(envelope.id);
        }));

        let started = Instant::now();
        for n in 0..5 {
            hub.broadcast(status(n));
        }
        assert!(started.elapsed() < Duration::from_millis(50));

        for _ in 0..5 {
            timeout(WAIT, rx.recv())
                .await
                .expect("delivery timed out")
                .expect("listener closed");
        }
    }

    #[tokio::test]
    async fn removed_listener_stops_receiving_new_events() {
        let hub = EventMulticaster::from_current().expect("runtime");
        let (listener, mut rx) = forwarding_listener();
        let id = hub.add_listener(listener);

        let before = hub.broadcast(status(1));
        assert!(hub.remove_listener(id));
        assert!(!hub.remove_listener(id));
        let after = hub.broadcast(status(2));

        let mut seen = Vec::new();
        while let Some(envelope) = timeout(WAIT, rx.recv()).await.expect("drain timed out") {
            seen.push(envelope.id);
        }
        assert!(seen.iter().all(|id| *id != after));
        assert!(seen.len() <= 1);
        if let Some(first) = seen.first() {
            assert_eq!(*first, before);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test]
    async fn stream_subscribers_receive_events() {
        let hub = EventMulticaster::from_current().expect("runtime");
        let (id, mut stream) = hub.subscribe();
        hub.broadcast(TorrentEvent::Started {
            info_hash: "aa".into(),
        });

        let envelope = timeout(WAIT, stream.next())
            .await
            .expect("stream timed out")
            .expect("stream closed");
        assert_eq!(envelope.event.kind(), "started");

        assert!(hub.remove_listener(id));
        assert!(timeout(WAIT, stream.next()).await.expect("closed").is_none());
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned_on_broadcast() {
        let hub = EventMulticaster::from_current().expect("runtime");
        let (_, stream) = hub.subscribe();
        drop(stream);
        assert_eq!(hub.listener_count(), 1);
        hub.broadcast(status(0));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn from_current_requires_runtime() {
        assert!(matches!(
            EventMulticaster::from_current(),
            Err(EventsError::RuntimeUnavailable { .. })
        ));
    }
}
