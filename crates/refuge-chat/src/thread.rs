//! One open conversation: history, sends, and the conversation-scoped
//! realtime channel.
//!
//! Opening a thread marks the counterpart's unread messages read in one
//! batch (idempotent server-side). Sends run through the delivery state
//! machine in [`crate::outbox`]: the message shows up immediately as
//! pending, is confirmed by the insert acknowledgement, or stays visible
//! as failed and retryable.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use refuge_backend::{
    Backend, ChangeEvent, ChangeKind, ChannelScope, Conversation, Message,
};
use refuge_shared::{ChannelState, ConversationId, MessageId, UserId};

use crate::error::{ChatError, Result};
use crate::outbox::{MessageLog, OutboxMessage};
use crate::subscriber::ChatChannel;

/// Default cap on history rows fetched when a thread opens.
const DEFAULT_PAGE_SIZE: u32 = 50;

pub struct ChatThread {
    backend: Arc<dyn Backend>,
    viewer: Option<UserId>,
    /// Chosen counterpart; set when the thread is opened from a profile
    /// rather than an existing conversation.
    counterpart: Option<UserId>,
    conversation: Option<Conversation>,
    log: MessageLog,
    channel: ChatChannel,
    page_size: u32,
}

impl ChatThread {
    /// `viewer` is the signed-in identity, injected by the caller. With
    /// `None`, opening and sending are no-ops.
    pub fn new(backend: Arc<dyn Backend>, viewer: Option<UserId>) -> Self {
        Self {
            backend,
            viewer,
            counterpart: None,
            conversation: None,
            log: MessageLog::new(),
            channel: ChatChannel::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn messages(&self) -> &[OutboxMessage] {
        self.log.entries()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation.as_ref().map(|c| c.id)
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Open an existing conversation: load history, batch-mark the
    /// counterpart's messages read, and subscribe to the thread's channel.
    pub async fn open(&mut self, conversation: ConversationId) -> Result<()> {
        if self.viewer.is_none() {
            return Ok(());
        }
        let conversation = self.backend.conversation(conversation).await?;
        self.bind(conversation).await
    }

    /// Open (or prepare) a thread with a counterpart. When no conversation
    /// exists yet, the thread stays unbound until the first send creates
    /// one.
    pub async fn open_with(&mut self, other: UserId) -> Result<()> {
        self.counterpart = Some(other);
        let Some(viewer) = self.viewer else {
            return Ok(());
        };
        if let Some(conversation) = self.backend.conversation_between(viewer, other).await? {
            self.bind(conversation).await?;
        }
        Ok(())
    }

    /// Tear the channel down. Call on screen unmount.
    pub fn close(&mut self) {
        self.channel.close();
    }

    /// Send a message in this thread.
    ///
    /// Returns the new message id, or `None` when no identity is signed in.
    /// On a rejected insert the message stays in the log as failed and the
    /// error propagates for the blocking notice; see [`ChatThread::retry`].
    pub async fn send(&mut self, body: &str) -> Result<Option<MessageId>> {
        let Some(viewer) = self.viewer else {
            warn!("Send without identity, ignoring");
            return Ok(None);
        };

        let conversation = match &self.conversation {
            Some(conversation) => conversation.clone(),
            None => {
                let other = self.counterpart.ok_or(ChatError::NoCounterpart)?;
                let conversation = self.ensure_conversation(viewer, other).await?;
                self.bind(conversation.clone()).await?;
                conversation
            }
        };

        let message = Message::new(conversation.id, viewer, body);
        let id = message.id;
        self.log.push_pending(message.clone());

        match self.backend.insert_message(&message).await {
            Ok(()) => {
                self.log.confirm(id);
                self.refresh_summary(conversation.id, body, message.sent_at).await;
                info!(message = %id, conversation = %conversation.id, "Message sent");
                Ok(Some(id))
            }
            Err(e) => {
                self.log.fail(id);
                warn!(message = %id, error = %e, "Send rejected, kept as failed");
                Err(e.into())
            }
        }
    }

    /// Re-attempt a failed send.
    pub async fn retry(&mut self, id: MessageId) -> Result<()> {
        let message = self
            .log
            .reset_for_retry(id)
            .ok_or(ChatError::NotRetryable(id))?;

        match self.backend.insert_message(&message).await {
            Ok(()) => {
                self.log.confirm(id);
                self.refresh_summary(message.conversation_id, &message.body, message.sent_at)
                    .await;
                info!(message = %id, "Retry delivered");
                Ok(())
            }
            Err(e) => {
                self.log.fail(id);
                warn!(message = %id, error = %e, "Retry rejected");
                Err(e.into())
            }
        }
    }

    /// Apply one realtime event for this conversation.
    pub fn apply_event(&mut self, event: &ChangeEvent) {
        let Some(conversation) = &self.conversation else {
            return;
        };
        if event.message.conversation_id != conversation.id {
            return;
        }

        match event.kind {
            ChangeKind::Insert => {
                if self.log.insert_confirmed(event.message.clone()) {
                    debug!(message = %event.message.id, "Message appended from channel");
                }
            }
            ChangeKind::Update => self.log.apply_read(&event.message),
            ChangeKind::Delete => self.log.remove(event.message.id),
        }
    }

    /// Drain every buffered channel event and apply it.
    pub fn pump(&mut self) {
        while let Some(event) = self.channel.try_recv() {
            self.apply_event(&event);
        }
    }

    async fn bind(&mut self, conversation: Conversation) -> Result<()> {
        let Some(viewer) = self.viewer else {
            return Ok(());
        };

        let history = self
            .backend
            .messages_for(conversation.id, self.page_size)
            .await?;
        self.log = MessageLog::load(history);

        let marked = self
            .backend
            .mark_read(conversation.id, viewer, Utc::now())
            .await?;
        if marked > 0 {
            self.log.mark_counterpart_read(viewer);
            debug!(conversation = %conversation.id, marked, "Marked messages read");
        }

        self.channel.open(
            self.backend.as_ref(),
            ChannelScope::Conversation(conversation.id),
        )?;
        self.counterpart = conversation.other_participant(viewer);
        self.conversation = Some(conversation);
        Ok(())
    }

    async fn ensure_conversation(
        &self,
        viewer: UserId,
        other: UserId,
    ) -> Result<Conversation> {
        // The counterpart may have opened one since this screen mounted.
        if let Some(existing) = self.backend.conversation_between(viewer, other).await? {
            return Ok(existing);
        }
        let conversation = Conversation::between(viewer, other);
        self.backend.insert_conversation(&conversation).await?;
        info!(conversation = %conversation.id, "Conversation created on first message");
        Ok(conversation)
    }

    /// Summary cache refresh is best effort; the row itself is already
    /// persisted and a reload repairs the cache.
    async fn refresh_summary(&self, conversation: ConversationId, body: &str, at: chrono::DateTime<Utc>) {
        if let Err(e) = self
            .backend
            .update_conversation_summary(conversation, body, at)
            .await
        {
            warn!(conversation = %conversation, error = %e, "Summary refresh failed");
        }
    }
}
