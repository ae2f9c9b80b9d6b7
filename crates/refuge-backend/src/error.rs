use thiserror::Error;

/// Errors produced by the backend client surface.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The platform could not be reached (network/transport failure).
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query expected a row but found none.
    #[error("Record not found")]
    NotFound,

    /// The platform rejected a mutation (constraint, row-level security).
    #[error("Mutation rejected: {0}")]
    Rejected(String),

    /// The realtime channel could not be opened or was closed by the server.
    #[error("Channel error: {0}")]
    Channel(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;
