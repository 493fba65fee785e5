//! Typed notifications about viewer-side changes.
//!
//! Handlers are called synchronously from [`CadViewer::poll`](crate::CadViewer::poll)
//! with a clone of each event. Handlers may subscribe or unsubscribe while an
//! event is being delivered; the change applies from the next event on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cadview_ipc::{LastPick, Property, ViewerResult};

/// Something that happened in the browser viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The viewer changed a synchronized property
    PropertyChanged(Property),
    /// An object was picked in the viewer
    Picked(LastPick),
    /// A screenshot result arrived and was routed
    ResultReceived(ViewerResult),
    /// The viewer was disposed
    Disposed,
}

/// Discriminant of a [`ViewerEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PropertyChanged,
    Picked,
    ResultReceived,
    Disposed,
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::PropertyChanged(_) => EventKind::PropertyChanged,
            ViewerEvent::Picked(_) => EventKind::Picked,
            ViewerEvent::ResultReceived(_) => EventKind::ResultReceived,
            ViewerEvent::Disposed => EventKind::Disposed,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ViewerEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Registry of event handlers.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(handler))
    }

    /// Call `handler` for events of one kind only
    pub fn subscribe_kind<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(handler))
    }

    fn insert(&self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { id, kind, handler });
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    pub fn emit(&self, event: &ViewerEvent) {
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.kind.is_none_or(|kind| kind == event.kind()))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
