//! # refuge-chat
//!
//! The realtime chat sync flow: inbox loading, unread tracking, channel
//! subscription lifecycle, and the thread view with an explicit delivery
//! state machine for outgoing messages.
//!
//! Every component takes the viewer identity as an explicit
//! `Option<UserId>` at construction; there is no process-wide current-user
//! state. An absent identity turns loads and sends into no-ops.

pub mod inbox;
pub mod outbox;
pub mod subscriber;
pub mod thread;
pub mod unread;

mod error;

pub use error::ChatError;
pub use inbox::{ConversationView, Inbox};
pub use outbox::{DeliveryState, MessageLog, OutboxMessage};
pub use subscriber::ChatChannel;
pub use thread::ChatThread;
pub use unread::UnreadTracker;
