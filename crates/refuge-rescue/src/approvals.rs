//! Adoption applications and the volunteer review workflow.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use refuge_backend::{
    AdoptionApplication, ApplicationStatus, Backend, PetStatus,
};
use refuge_shared::{ApplicationId, PetId, UserId};

use crate::error::{RescueError, Result};

/// The application and review screens' data layer.
pub struct AdoptionDesk {
    backend: Arc<dyn Backend>,
    viewer: Option<UserId>,
}

impl AdoptionDesk {
    pub fn new(backend: Arc<dyn Backend>, viewer: Option<UserId>) -> Self {
        Self { backend, viewer }
    }

    /// Apply to adopt a listed pet. Returns `None` when no identity is
    /// signed in. The pet must still be available.
    pub async fn apply(&self, pet: PetId, message: &str) -> Result<Option<ApplicationId>> {
        let Some(viewer) = self.viewer else {
            warn!("Application without identity, ignoring");
            return Ok(None);
        };

        let listing = self.backend.pet(pet).await?;
        if listing.status != PetStatus::Available {
            return Err(RescueError::PetUnavailable(pet));
        }

        let application = AdoptionApplication {
            id: ApplicationId::new(),
            pet_id: pet,
            applicant: viewer,
            message: message.to_string(),
            status: ApplicationStatus::Submitted,
            reviewed_by: None,
            created_at: Utc::now(),
        };
        self.backend.insert_application(&application).await?;
        info!(application = %application.id, pet = %pet, "Adoption application submitted");
        Ok(Some(application.id))
    }

    /// Applications for one pet, oldest first.
    pub async fn applications(&self, pet: PetId) -> Result<Vec<AdoptionApplication>> {
        Ok(self.backend.applications_for_pet(pet).await?)
    }

    /// Approve an application; the pet moves to pending adoption.
    pub async fn approve(&self, id: ApplicationId) -> Result<()> {
        let Some(reviewer) = self.review_identity("approve applications").await? else {
            return Ok(());
        };

        let application = self.backend.application(id).await?;
        match application.status {
            ApplicationStatus::Approved => return Ok(()),
            ApplicationStatus::Rejected => return Err(RescueError::AlreadyReviewed(id)),
            ApplicationStatus::Submitted => {}
        }

        self.backend
            .update_application_status(id, ApplicationStatus::Approved, reviewer)
            .await?;
        self.backend
            .update_pet_status(application.pet_id, PetStatus::PendingAdoption)
            .await?;
        info!(application = %id, reviewer = %reviewer, "Application approved");
        Ok(())
    }

    /// Reject an application; the listing stays available.
    pub async fn reject(&self, id: ApplicationId) -> Result<()> {
        let Some(reviewer) = self.review_identity("reject applications").await? else {
            return Ok(());
        };

        let application = self.backend.application(id).await?;
        match application.status {
            ApplicationStatus::Rejected => return Ok(()),
            ApplicationStatus::Approved => return Err(RescueError::AlreadyReviewed(id)),
            ApplicationStatus::Submitted => {}
        }

        self.backend
            .update_application_status(id, ApplicationStatus::Rejected, reviewer)
            .await?;
        info!(application = %id, reviewer = %reviewer, "Application rejected");
        Ok(())
    }

    /// The signed-in identity if it may review, `None` for the signed-out
    /// no-op path, an error for signed-in identities without review rights.
    async fn review_identity(&self, action: &'static str) -> Result<Option<UserId>> {
        let Some(viewer) = self.viewer else {
            warn!("Review without identity, ignoring");
            return Ok(None);
        };
        let profile = self.backend.profile(viewer).await?;
        if !profile.role.can_review() {
            return Err(RescueError::Unauthorized(action));
        }
        Ok(Some(viewer))
    }
}
