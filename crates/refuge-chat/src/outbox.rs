//! The thread's visible message list with per-message delivery tracking.
//!
//! Outgoing messages move through an explicit state machine,
//! `Pending -> Confirmed | Failed`, instead of being appended
//! optimistically and forgotten. A failed send stays visible, flagged,
//! and retryable; it is never silently dropped.

use serde::Serialize;

use refuge_backend::Message;
use refuge_shared::MessageId;

/// Delivery progress of one message from the viewer's perspective.
///
/// Messages loaded from the server or received over the channel are
/// `Confirmed` by definition.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Appended locally, insert not yet acknowledged.
    Pending,
    /// The server accepted the row.
    Confirmed,
    /// The server rejected the row; retryable.
    Failed,
}

/// One row of the thread view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboxMessage {
    pub message: Message,
    pub delivery: DeliveryState,
}

/// Ordered message list for one open thread.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<OutboxMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log from a history fetch. Everything persisted is confirmed.
    pub fn load(history: Vec<Message>) -> Self {
        Self {
            entries: history
                .into_iter()
                .map(|message| OutboxMessage {
                    message,
                    delivery: DeliveryState::Confirmed,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[OutboxMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.entries.iter().any(|e| e.message.id == id)
    }

    /// Append a locally fabricated message awaiting acknowledgement.
    pub fn push_pending(&mut self, message: Message) {
        self.entries.push(OutboxMessage {
            message,
            delivery: DeliveryState::Pending,
        });
    }

    /// Acknowledge a pending send. Returns `false` if the id is unknown.
    pub fn confirm(&mut self, id: MessageId) -> bool {
        self.set_delivery(id, DeliveryState::Confirmed)
    }

    /// Flag a rejected send. Returns `false` if the id is unknown.
    pub fn fail(&mut self, id: MessageId) -> bool {
        self.set_delivery(id, DeliveryState::Failed)
    }

    /// Put a failed entry back into flight for a retry attempt.
    /// Returns the message to resend, or `None` if the entry is not failed.
    pub fn reset_for_retry(&mut self, id: MessageId) -> Option<Message> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.message.id == id && e.delivery == DeliveryState::Failed)?;
        entry.delivery = DeliveryState::Pending;
        Some(entry.message.clone())
    }

    /// Apply an incoming insert event. Our own echo (an id we already hold)
    /// is deduplicated; anything new is appended in arrival order.
    /// Returns whether the list changed.
    pub fn insert_confirmed(&mut self, message: Message) -> bool {
        if self.contains(message.id) {
            return false;
        }
        self.entries.push(OutboxMessage {
            message,
            delivery: DeliveryState::Confirmed,
        });
        true
    }

    /// Apply an incoming update event: patch the read flag of the matching
    /// row. Read state only ever moves forward.
    pub fn apply_read(&mut self, updated: &Message) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.message.id == updated.id) {
            if updated.read && !entry.message.read {
                entry.message.read = true;
                entry.message.read_at = updated.read_at;
            }
        }
    }

    /// Apply an incoming delete event.
    pub fn remove(&mut self, id: MessageId) {
        self.entries.retain(|e| e.message.id != id);
    }

    /// Mark every confirmed row not authored by `viewer` as read locally,
    /// mirroring the batch update the open-thread flow just issued.
    pub fn mark_counterpart_read(&mut self, viewer: refuge_shared::UserId) {
        for entry in &mut self.entries {
            if entry.message.sender != viewer {
                entry.message.read = true;
            }
        }
    }

    /// Ids of entries currently in the failed state.
    pub fn failed_ids(&self) -> Vec<MessageId> {
        self.entries
            .iter()
            .filter(|e| e.delivery == DeliveryState::Failed)
            .map(|e| e.message.id)
            .collect()
    }

    fn set_delivery(&mut self, id: MessageId, delivery: DeliveryState) -> bool {
        match self.entries.iter_mut().find(|e| e.message.id == id) {
            Some(entry) => {
                entry.delivery = delivery;
                true
            }
            None => false,
        }
    }
}
