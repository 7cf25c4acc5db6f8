//! Fan-out of session notifications to any number of subscribers.
//!
//! Handlers may be added or removed at any time, including from inside a
//! handler: every emission iterates a snapshot of the registry taken
//! before the first handler runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::preview::PreviewFrame;
use crate::state::ConnectionState;
use crate::status::CameraStatus;

/// The four notification kinds a session publishes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// `reason` is set when the change was caused by a failure.
    StateChanged {
        state: ConnectionState,
        reason: Option<String>,
    },
    RecordingChanged(bool),
    StatusChanged(CameraStatus),
    PreviewFrame(Arc<PreviewFrame>),
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&SessionEvent) + Send + Sync + 'static>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<SubscriptionId, Handler>>,
}

/// Cloneable broadcast registry shared by the application and the session.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run on the emitting task and must not block.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers().insert(id, Arc::new(handler));
        id
    }

    /// Forward every event into an unbounded channel.
    ///
    /// The subscription removes itself once the receiver is dropped.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::downgrade(&self.registry);
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let handler = move |event: &SessionEvent| {
            if tx.send(event.clone()).is_err() {
                if let Some(registry) = registry.upgrade() {
                    EventBus { registry }.unsubscribe(id);
                }
            }
        };
        self.handlers().insert(id, Arc::new(handler));
        (id, rx)
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers().len()
    }

    /// Deliver `event` to a snapshot of the current subscribers.
    pub fn emit(&self, event: &SessionEvent) {
        let snapshot: Vec<Handler> = self.handlers().values().cloned().collect();
        for handler in snapshot {
            handler(event);
        }
    }

    fn handlers(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Handler>> {
        // Handlers run outside this lock.
        self.registry
            .handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
