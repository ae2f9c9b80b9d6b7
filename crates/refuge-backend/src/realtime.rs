//! Realtime change channels with typed event fan-out.
//!
//! A screen subscribes with a [`ChannelScope`] and receives
//! [`ChangeEvent`]s over a tokio mpsc channel. Dropping the
//! [`Subscription`] removes the registration, so a remounted screen never
//! accumulates duplicate handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use refuge_shared::{ConversationId, UserId};

use crate::error::Result;
use crate::models::Message;

/// Events a subscriber can buffer before the hub starts dropping.
const CHANNEL_CAPACITY: usize = 256;

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change to the message collection, as delivered on a channel.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The row after the change (before, for deletes).
    pub message: Message,
    /// Participants of the owning conversation, so participant-scoped
    /// channels can filter without a lookup.
    pub participants: [UserId; 2],
}

/// Row filter attached to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    /// One specific conversation (thread screen).
    Conversation(ConversationId),
    /// Every conversation involving an identity (inbox screen).
    Participant(UserId),
}

impl ChannelScope {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            ChannelScope::Conversation(id) => event.message.conversation_id == *id,
            ChannelScope::Participant(user) => event.participants.contains(user),
        }
    }
}

/// Anything that can hand out realtime subscriptions.
pub trait Realtime: Send + Sync {
    fn subscribe(&self, scope: ChannelScope) -> Result<Subscription>;
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

struct SubscriberEntry {
    id: u64,
    scope: ChannelScope,
    tx: mpsc::Sender<ChangeEvent>,
}

/// Fan-out registry connecting the store's mutations to open subscriptions.
pub struct RealtimeHub {
    subscribers: Mutex<Vec<SubscriberEntry>>,
    next_id: AtomicU64,
}

impl RealtimeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a new subscriber and return its receiving handle.
    pub fn subscribe(self: &Arc<Self>, scope: ChannelScope) -> Subscription {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(SubscriberEntry { id, scope, tx });

        debug!(subscription = id, ?scope, "Channel subscribed");
        Subscription {
            id,
            hub: Arc::clone(self),
            rx,
        }
    }

    /// Deliver an event to every subscriber whose scope matches.
    ///
    /// Subscribers whose receiver is gone are pruned; subscribers whose
    /// buffer is full lose the event (the hosted transport behaves the
    /// same way under backpressure).
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|p| p.into_inner());

        subscribers.retain(|entry| {
            if !entry.scope.matches(&event) {
                return true;
            }
            match entry.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscription = entry.id, "Subscriber buffer full, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Number of live subscriptions. Used to assert teardown in tests.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|entry| entry.id != id);
        debug!(subscription = id, "Channel unsubscribed");
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Receiving half of one realtime channel.
///
/// The registration lives exactly as long as this handle: dropping it (or
/// calling [`Subscription::close`]) unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Arc<RealtimeHub>,
    rx: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wait for the next event. `None` means the channel was closed by
    /// the server side.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Non-blocking poll for an already-buffered event.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Tear the channel down explicitly.
    pub fn close(self) {
        // Drop impl does the unsubscribe.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
