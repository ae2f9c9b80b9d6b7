use thiserror::Error;

use refuge_backend::BackendError;
use refuge_shared::MessageId;

/// Errors produced by the chat flow.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The backend call behind an operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A thread was asked to send before a counterpart was chosen.
    #[error("No counterpart selected for this thread")]
    NoCounterpart,

    /// Retry was requested for a message that is not in the failed state.
    #[error("Message {0} has no failed delivery to retry")]
    NotRetryable(MessageId),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
