use thiserror::Error;

use refuge_backend::BackendError;
use refuge_shared::{ApplicationId, PetId};

/// Errors produced by the rescue services.
#[derive(Error, Debug)]
pub enum RescueError {
    /// The backend call behind an operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The viewer's role does not allow the operation.
    #[error("Not authorized to {0}")]
    Unauthorized(&'static str),

    /// GPS coordinates outside their legal ranges.
    #[error("Invalid GPS coordinates: {latitude}, {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },

    /// The pet is no longer open for applications.
    #[error("Pet {0} is not available for adoption")]
    PetUnavailable(PetId),

    /// The application was already reviewed with a different outcome.
    #[error("Application {0} was already reviewed")]
    AlreadyReviewed(ApplicationId),

    /// A report status transition that the workflow does not allow.
    #[error("Report transition not allowed: {0}")]
    InvalidTransition(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RescueError>;
