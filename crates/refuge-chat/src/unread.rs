//! Per-conversation unread counters.
//!
//! The tracker caches a server-side fact: the number of messages in each
//! conversation authored by the other participant with `read = false`. It
//! is recomputed on every full load and nudged incrementally on realtime
//! events, so it may drift transiently; the next load corrects it.

use std::collections::HashMap;

use refuge_backend::Message;
use refuge_shared::{ConversationId, UserId};

#[derive(Debug, Default)]
pub struct UnreadTracker {
    counts: HashMap<ConversationId, u64>,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the counter for a conversation with a freshly computed value.
    /// Also registers the conversation as known.
    pub fn set(&mut self, conversation: ConversationId, count: u64) {
        self.counts.insert(conversation, count);
    }

    /// Current count for a conversation; unknown conversations read as zero.
    pub fn get(&self, conversation: ConversationId) -> u64 {
        self.counts.get(&conversation).copied().unwrap_or(0)
    }

    /// Sum across all tracked conversations (badge on the inbox tab).
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Apply a realtime insert: bump the counter if the conversation is
    /// known and the author is not the viewer. Returns whether anything
    /// changed.
    pub fn record_insert(&mut self, viewer: UserId, message: &Message) -> bool {
        if message.sender == viewer {
            return false;
        }
        match self.counts.get_mut(&message.conversation_id) {
            Some(count) => {
                *count += 1;
                true
            }
            // Unknown conversation: left unchanged, the next full load
            // picks it up.
            None => false,
        }
    }

    /// The viewer opened the thread: its counter drops to zero.
    pub fn reset(&mut self, conversation: ConversationId) {
        if let Some(count) = self.counts.get_mut(&conversation) {
            *count = 0;
        }
    }

    /// Stop tracking a deleted conversation.
    pub fn forget(&mut self, conversation: ConversationId) {
        self.counts.remove(&conversation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_from_counterpart_increments() {
        let viewer = UserId::new();
        let other = UserId::new();
        let conversation = ConversationId::new();

        let mut tracker = UnreadTracker::new();
        tracker.set(conversation, 0);

        let incoming = Message::new(conversation, other, "hi");
        assert!(tracker.record_insert(viewer, &incoming));
        assert!(tracker.record_insert(viewer, &incoming));
        assert_eq!(tracker.get(conversation), 2);
    }

    #[test]
    fn test_own_insert_ignored() {
        let viewer = UserId::new();
        let conversation = ConversationId::new();

        let mut tracker = UnreadTracker::new();
        tracker.set(conversation, 3);

        let own = Message::new(conversation, viewer, "mine");
        assert!(!tracker.record_insert(viewer, &own));
        assert_eq!(tracker.get(conversation), 3);
    }

    #[test]
    fn test_unknown_conversation_unchanged() {
        let viewer = UserId::new();
        let mut tracker = UnreadTracker::new();

        let stray = Message::new(ConversationId::new(), UserId::new(), "?");
        assert!(!tracker.record_insert(viewer, &stray));
        assert_eq!(tracker.total(), 0);
    }

    #[test]
    fn test_reset_clamps_at_zero() {
        let conversation = ConversationId::new();
        let mut tracker = UnreadTracker::new();
        tracker.set(conversation, 5);

        tracker.reset(conversation);
        tracker.reset(conversation);
        assert_eq!(tracker.get(conversation), 0);
    }

    #[test]
    fn test_total_spans_conversations() {
        let mut tracker = UnreadTracker::new();
        tracker.set(ConversationId::new(), 2);
        tracker.set(ConversationId::new(), 3);
        assert_eq!(tracker.total(), 5);
    }
}
