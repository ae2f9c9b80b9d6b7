//! Browsing and posting adoptable pets.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use refuge_backend::{Backend, PetListing, PetStatus, Species};
use refuge_shared::{PetId, UserId};

use crate::error::{RescueError, Result};

/// Fields the posting form collects.
#[derive(Debug, Clone, Deserialize)]
pub struct PetDraft {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub age_months: Option<u32>,
    pub description: String,
    pub photo_url: Option<String>,
}

/// Client-side filter applied after the listing fetch.
#[derive(Debug, Clone, Default)]
pub struct PetFilter {
    pub species: Option<Species>,
    pub status: Option<PetStatus>,
    /// Case-insensitive match over name, breed, and description.
    pub query: Option<String>,
}

impl PetFilter {
    fn matches(&self, pet: &PetListing) -> bool {
        if self.species.map_or(false, |s| pet.species != s) {
            return false;
        }
        if self.status.map_or(false, |s| pet.status != s) {
            return false;
        }
        match &self.query {
            None => true,
            Some(query) => {
                let query = query.to_lowercase();
                pet.name.to_lowercase().contains(&query)
                    || pet
                        .breed
                        .as_deref()
                        .is_some_and(|b| b.to_lowercase().contains(&query))
                    || pet.description.to_lowercase().contains(&query)
            }
        }
    }
}

/// The pet listing screens' data layer.
pub struct PetDirectory {
    backend: Arc<dyn Backend>,
    viewer: Option<UserId>,
}

impl PetDirectory {
    pub fn new(backend: Arc<dyn Backend>, viewer: Option<UserId>) -> Self {
        Self { backend, viewer }
    }

    /// Listings matching `filter`, newest first.
    pub async fn browse(&self, filter: &PetFilter) -> Result<Vec<PetListing>> {
        let pets = self.backend.list_pets().await?;
        Ok(pets.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Post a new listing. Returns `None` when no identity is signed in.
    pub async fn post(&self, draft: PetDraft) -> Result<Option<PetId>> {
        let Some(viewer) = self.viewer else {
            warn!("Pet post without identity, ignoring");
            return Ok(None);
        };

        let pet = PetListing {
            id: PetId::new(),
            name: draft.name,
            species: draft.species,
            breed: draft.breed,
            age_months: draft.age_months,
            description: draft.description,
            photo_url: draft.photo_url,
            posted_by: viewer,
            status: PetStatus::Available,
            created_at: Utc::now(),
        };
        self.backend.insert_pet(&pet).await?;
        info!(pet = %pet.id, name = %pet.name, "Pet listed");
        Ok(Some(pet.id))
    }

    /// Change a listing's status. Allowed for the poster and for
    /// volunteers/admins.
    pub async fn set_status(&self, id: PetId, status: PetStatus) -> Result<()> {
        let Some(viewer) = self.viewer else {
            warn!("Status change without identity, ignoring");
            return Ok(());
        };

        let pet = self.backend.pet(id).await?;
        if pet.posted_by != viewer {
            let profile = self.backend.profile(viewer).await?;
            if !profile.role.can_review() {
                return Err(RescueError::Unauthorized("change this listing"));
            }
        }

        self.backend.update_pet_status(id, status).await?;
        info!(pet = %id, ?status, "Pet status changed");
        Ok(())
    }
}
