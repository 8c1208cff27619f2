//! Sync event bus for observing sync runs.
//!
//! The bus distributes sync lifecycle events to every current subscriber:
//! - Events of one run are delivered in emission order
//! - Late subscribers never see earlier events
//! - Callbacks run outside the subscriber lock, so an observer may
//!   unsubscribe from inside its own callback
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = Arc::new(SyncEventBus::new());
//! let (handle, mut events) = bus.subscribe_channel();
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event.kind);
//!     }
//! });
//!
//! // later
//! bus.unsubscribe(handle);
//! ```

use crate::error::SyncError;
use crate::session::SyncSessionResult;
use casha_model::{Domain, LocalId, RemoteId, SyncStateKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEventKind {
    /// A run started.
    Started,
    /// One record was pushed.
    EntitySynced {
        /// The record.
        local_id: LocalId,
        /// Its remote id, if it still exists remotely.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote_id: Option<RemoteId>,
        /// The operation pushed.
        operation: SyncStateKind,
    },
    /// One record failed to push.
    EntityFailed {
        /// The record.
        local_id: LocalId,
        /// Why.
        error: SyncError,
    },
    /// A run finished.
    Completed(SyncSessionResult),
}

/// A sync lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Domain of the run.
    pub domain: Domain,
    /// Run number within the domain's coordinator.
    pub session_id: u64,
    /// What happened.
    pub kind: SyncEventKind,
}

impl SyncEvent {
    /// Creates an event.
    pub fn new(domain: Domain, session_id: u64, kind: SyncEventKind) -> Self {
        Self {
            domain,
            session_id,
            kind,
        }
    }

    /// Returns the session result if this is a completion event.
    pub fn result(&self) -> Option<&SyncSessionResult> {
        match &self.kind {
            SyncEventKind::Completed(result) => Some(result),
            _ => None,
        }
    }
}

/// A callback subscriber.
///
/// Called synchronously from the publishing coordinator, in publish order.
/// Implementations should return quickly.
pub trait SyncObserver: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &SyncEvent);
}

impl<F> SyncObserver for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Proof of a subscription, released with [`SyncEventBus::unsubscribe`].
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the handle leaves the subscription in place"]
pub struct SubscriptionHandle {
    id: u64,
}

#[derive(Clone)]
enum Subscriber {
    Observer(Arc<dyn SyncObserver>),
    Channel(UnboundedSender<SyncEvent>),
}

/// An in-memory publish/subscribe channel for sync events.
///
/// Owned by the composition root and injected into every coordinator.
pub struct SyncEventBus {
    subscribers: RwLock<Vec<(u64, Subscriber)>>,
    next_id: AtomicU64,
}

impl SyncEventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes a callback observer.
    pub fn subscribe(&self, observer: Arc<dyn SyncObserver>) -> SubscriptionHandle {
        self.add(Subscriber::Observer(observer))
    }

    /// Subscribes a channel. Dropping the receiver ends the subscription on
    /// the next publish.
    pub fn subscribe_channel(&self) -> (SubscriptionHandle, UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.add(Subscriber::Channel(tx)), rx)
    }

    /// Ends a subscription. Returns false if it had already ended.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != handle.id);
        subscribers.len() != before
    }

    /// Delivers an event to every current subscriber. Returns how many
    /// received it.
    pub fn publish(&self, event: SyncEvent) -> usize {
        let snapshot: Vec<(u64, Subscriber)> = self.subscribers.read().clone();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Observer(observer) => {
                    observer.on_event(&event);
                    delivered += 1;
                }
                Subscriber::Channel(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            self.subscribers
                .write()
                .retain(|(id, _)| !closed.contains(id));
        }
        delivered
    }

    /// Returns the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn add(&self, subscriber: Subscriber) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.write().push((id, subscriber));
        SubscriptionHandle { id }
    }
}

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
