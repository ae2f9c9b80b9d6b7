//! Conversation list for the inbox screen.
//!
//! [`Inbox::load`] projects the viewer's conversations into enriched
//! view-records: counterpart profile, latest message preview, unread count,
//! sorted by most recent activity. Realtime inserts patch the affected row
//! in place; update and delete events fall back to a full reload, which is
//! the documented behavior of this screen (it also repairs any drift in the
//! denormalized summary fields).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use refuge_backend::{Backend, ChangeEvent, ChangeKind, ChannelScope, Message};
use refuge_shared::{ChannelState, ConversationId, UserId};

use crate::error::Result;
use crate::subscriber::ChatChannel;
use crate::unread::UnreadTracker;

/// Placeholder shown when a counterpart's profile cannot be fetched.
const UNKNOWN_USER: &str = "Unknown user";

/// One row of the inbox, ready for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversationView {
    pub conversation_id: ConversationId,
    /// The counterpart identity.
    pub other: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Preview of the most recent message; empty when none could be
    /// resolved.
    pub last_message: String,
    /// Timestamp the list is ordered by, newest first.
    pub last_activity: DateTime<Utc>,
    pub unread: u64,
}

/// The inbox screen's state: loaded rows, unread counters, and the
/// participant-scoped realtime channel.
pub struct Inbox {
    backend: Arc<dyn Backend>,
    viewer: Option<UserId>,
    rows: Vec<ConversationView>,
    unread: UnreadTracker,
    channel: ChatChannel,
}

impl Inbox {
    /// `viewer` is the signed-in identity, injected by the caller. With
    /// `None`, every operation is a no-op over an empty list.
    pub fn new(backend: Arc<dyn Backend>, viewer: Option<UserId>) -> Self {
        Self {
            backend,
            viewer,
            rows: Vec::new(),
            unread: UnreadTracker::new(),
            channel: ChatChannel::new(),
        }
    }

    pub fn rows(&self) -> &[ConversationView] {
        &self.rows
    }

    pub fn unread_for(&self, conversation: ConversationId) -> u64 {
        self.unread.get(conversation)
    }

    pub fn total_unread(&self) -> u64 {
        self.unread.total()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Rebuild the whole list from the backend.
    ///
    /// A failure of the top-level conversation query clears the list and
    /// propagates, so the screen shows an error state rather than stale
    /// rows. Per-row enrichment failures degrade to placeholders instead.
    pub async fn load(&mut self) -> Result<()> {
        let Some(viewer) = self.viewer else {
            self.rows.clear();
            self.unread = UnreadTracker::new();
            return Ok(());
        };

        let conversations = match self.backend.conversations_for(viewer).await {
            Ok(conversations) => conversations,
            Err(e) => {
                self.rows.clear();
                self.unread = UnreadTracker::new();
                return Err(e.into());
            }
        };

        let mut rows = Vec::with_capacity(conversations.len());
        let mut unread = UnreadTracker::new();

        for conversation in conversations {
            let Some(other) = conversation.other_participant(viewer) else {
                warn!(conversation = %conversation.id, "Viewer not a participant, skipping row");
                continue;
            };

            let (display_name, avatar_url) = match self.backend.profile(other).await {
                Ok(profile) => (profile.display_name, profile.avatar_url),
                Err(e) => {
                    warn!(user = %other, error = %e, "Profile fetch failed, using placeholder");
                    (UNKNOWN_USER.to_string(), None)
                }
            };

            let latest = match self.backend.latest_message(conversation.id).await {
                Ok(latest) => latest,
                Err(e) => {
                    warn!(conversation = %conversation.id, error = %e, "Latest message fetch failed");
                    None
                }
            };

            let count = match self.backend.count_unread(conversation.id, viewer).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(conversation = %conversation.id, error = %e, "Unread count fetch failed");
                    0
                }
            };
            unread.set(conversation.id, count);

            let last_message = latest
                .as_ref()
                .map(|m| m.body.clone())
                .or_else(|| conversation.last_message.clone())
                .unwrap_or_default();
            let last_activity = latest
                .map(|m| m.sent_at)
                .unwrap_or_else(|| conversation.activity_at());

            rows.push(ConversationView {
                conversation_id: conversation.id,
                other,
                display_name,
                avatar_url,
                last_message,
                last_activity,
                unread: count,
            });
        }

        rows.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        self.rows = rows;
        self.unread = unread;
        debug!(rows = self.rows.len(), "Inbox loaded");
        Ok(())
    }

    /// Open the participant-scoped channel. Call on screen mount, after
    /// [`Inbox::load`].
    pub fn mount(&mut self) -> Result<()> {
        let Some(viewer) = self.viewer else {
            return Ok(());
        };
        self.channel
            .open(self.backend.as_ref(), ChannelScope::Participant(viewer))
    }

    /// Tear the channel down. Call on screen unmount.
    pub fn unmount(&mut self) {
        self.channel.close();
    }

    /// Apply one realtime event.
    ///
    /// Inserts patch the matching row incrementally; updates and deletes
    /// re-run the full loader.
    pub async fn handle_event(&mut self, event: &ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Insert => {
                self.apply_insert(&event.message);
                Ok(())
            }
            ChangeKind::Update | ChangeKind::Delete => self.load().await,
        }
    }

    /// Drain every buffered channel event and apply it.
    pub async fn pump(&mut self) -> Result<()> {
        while let Some(event) = self.channel.try_recv() {
            self.handle_event(&event).await?;
        }
        Ok(())
    }

    /// The viewer opened a thread: drop its unread badge to zero without
    /// waiting for a reload.
    pub fn clear_unread(&mut self, conversation: ConversationId) {
        self.unread.reset(conversation);
        if let Some(row) = self.row_mut(conversation) {
            row.unread = 0;
        }
    }

    /// Explicit user action: delete a conversation and its messages.
    pub async fn delete_conversation(&mut self, conversation: ConversationId) -> Result<bool> {
        let deleted = self.backend.delete_conversation(conversation).await?;
        if deleted {
            self.rows.retain(|row| row.conversation_id != conversation);
            self.unread.forget(conversation);
            info!(conversation = %conversation, "Conversation deleted");
        }
        Ok(deleted)
    }

    fn apply_insert(&mut self, message: &Message) {
        let Some(viewer) = self.viewer else {
            return;
        };

        let changed = self.unread.record_insert(viewer, message);
        let count = self.unread.get(message.conversation_id);

        let Some(row) = self.row_mut(message.conversation_id) else {
            // Conversations we have never loaded stay invisible until the
            // next full load.
            debug!(conversation = %message.conversation_id, "Insert for unknown conversation, ignoring");
            return;
        };

        row.last_message = message.body.clone();
        row.last_activity = message.sent_at;
        if changed {
            row.unread = count;
        }
        self.rows
            .sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    }

    fn row_mut(&mut self, conversation: ConversationId) -> Option<&mut ConversationView> {
        self.rows
            .iter_mut()
            .find(|row| row.conversation_id == conversation)
    }
}
