//! Channel lifecycle for one mounted screen.
//!
//! Wraps a backend [`Subscription`] in the state machine
//! `Disconnected -> Subscribing -> Subscribed -> (Error | Disconnected)`.
//! The screen opens the channel on mount and must close it on unmount;
//! re-opening first tears down the previous registration so repeated
//! mounts never stack handlers.

use tracing::{debug, warn};

use refuge_backend::{Backend, ChangeEvent, ChannelScope, Subscription};
use refuge_shared::ChannelState;

use crate::error::Result;

pub struct ChatChannel {
    state: ChannelState,
    subscription: Option<Subscription>,
}

impl ChatChannel {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Disconnected,
            subscription: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.state == ChannelState::Subscribed
    }

    /// Open a channel with the given scope, replacing any previous one.
    ///
    /// On failure the state lands in `Error`; reconnection is the
    /// transport's job, the caller just surfaces the indicator.
    pub fn open(&mut self, backend: &dyn Backend, scope: ChannelScope) -> Result<()> {
        self.close();
        self.state = ChannelState::Subscribing;

        match backend.subscribe(scope) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = ChannelState::Subscribed;
                debug!(?scope, "Channel open");
                Ok(())
            }
            Err(e) => {
                self.state = ChannelState::Error;
                warn!(?scope, error = %e, "Channel subscribe failed");
                Err(e.into())
            }
        }
    }

    /// Wait for the next event. `None` with state `Error` means the server
    /// closed the channel under us.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        let subscription = self.subscription.as_mut()?;
        match subscription.recv().await {
            Some(event) => Some(event),
            None => {
                self.subscription = None;
                self.state = ChannelState::Error;
                warn!("Channel closed by transport");
                None
            }
        }
    }

    /// Non-blocking poll for an already-delivered event.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.subscription.as_mut()?.try_recv()
    }

    /// Tear the channel down. Safe to call when already closed.
    pub fn close(&mut self) {
        if self.subscription.take().is_some() {
            debug!("Channel closed");
        }
        self.state = ChannelState::Disconnected;
    }
}

impl Default for ChatChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChatChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use refuge_backend::{ChatStore, Conversation, MemoryBackend, Message};
    use refuge_shared::UserId;

    #[tokio::test]
    async fn test_lifecycle_states() {
        let backend = MemoryBackend::new();
        let viewer = UserId::new();

        let mut channel = ChatChannel::new();
        assert_eq!(channel.state(), ChannelState::Disconnected);

        channel
            .open(&backend, ChannelScope::Participant(viewer))
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Subscribed);

        channel.close();
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_subscribe_failure_sets_error() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);

        let mut channel = ChatChannel::new();
        let result = channel.open(&backend, ChannelScope::Participant(UserId::new()));

        assert!(result.is_err());
        assert_eq!(channel.state(), ChannelState::Error);
    }

    #[tokio::test]
    async fn test_reopen_replaces_registration() {
        let backend = MemoryBackend::new();
        let a = UserId::new();
        let b = UserId::new();
        let conversation = Conversation::between(a, b);
        backend.insert_conversation(&conversation).await.unwrap();

        let mut channel = ChatChannel::new();
        channel.open(&backend, ChannelScope::Participant(a)).unwrap();
        channel.open(&backend, ChannelScope::Participant(a)).unwrap();
        assert_eq!(backend.subscriber_count(), 1);

        backend
            .insert_message(&Message::new(conversation.id, b, "once"))
            .await
            .unwrap();

        // One mount cycle, one delivery.
        assert!(channel.try_recv().is_some());
        assert!(channel.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_tears_down() {
        let backend = MemoryBackend::new();
        let mut channel = ChatChannel::new();
        channel
            .open(&backend, ChannelScope::Participant(UserId::new()))
            .unwrap();

        drop(channel);
        assert_eq!(backend.subscriber_count(), 0);
    }
}
