//! Stray sightings filed with the reporter's GPS location.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use refuge_backend::{Backend, GeoPoint, ReportStatus, StrayReport};
use refuge_shared::{ReportId, UserId};

use crate::error::{RescueError, Result};

/// The report screens' data layer.
pub struct ReportDesk {
    backend: Arc<dyn Backend>,
    viewer: Option<UserId>,
}

impl ReportDesk {
    pub fn new(backend: Arc<dyn Backend>, viewer: Option<UserId>) -> Self {
        Self { backend, viewer }
    }

    /// File a sighting. Returns `None` when no identity is signed in.
    /// Coordinates are validated before anything is sent.
    pub async fn file(
        &self,
        description: &str,
        location: GeoPoint,
        photo_url: Option<String>,
    ) -> Result<Option<ReportId>> {
        let Some(viewer) = self.viewer else {
            warn!("Report without identity, ignoring");
            return Ok(None);
        };
        if !location.is_valid() {
            return Err(RescueError::InvalidLocation {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }

        let report = StrayReport {
            id: ReportId::new(),
            reporter: viewer,
            description: description.to_string(),
            photo_url,
            location,
            status: ReportStatus::Open,
            created_at: Utc::now(),
        };
        self.backend.insert_report(&report).await?;
        info!(report = %report.id, "Stray report filed");
        Ok(Some(report.id))
    }

    /// Reports in a given status, or all of them, newest first.
    pub async fn reports(&self, status: Option<ReportStatus>) -> Result<Vec<StrayReport>> {
        Ok(self.backend.list_reports(status).await?)
    }

    /// A volunteer takes an open report.
    pub async fn claim(&self, id: ReportId) -> Result<()> {
        self.transition(id, ReportStatus::Claimed, "claim this report")
            .await
    }

    /// Close out a report once the animal is safe.
    pub async fn resolve(&self, id: ReportId) -> Result<()> {
        self.transition(id, ReportStatus::Resolved, "resolve this report")
            .await
    }

    async fn transition(
        &self,
        id: ReportId,
        to: ReportStatus,
        action: &'static str,
    ) -> Result<()> {
        let Some(viewer) = self.viewer else {
            warn!("Report transition without identity, ignoring");
            return Ok(());
        };

        let profile = self.backend.profile(viewer).await?;
        if !profile.role.can_review() {
            return Err(RescueError::Unauthorized(action));
        }

        let current = self
            .backend
            .list_reports(None)
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(refuge_backend::BackendError::NotFound)?;

        match (current.status, to) {
            (ReportStatus::Open, ReportStatus::Claimed)
            | (ReportStatus::Open, ReportStatus::Resolved)
            | (ReportStatus::Claimed, ReportStatus::Resolved) => {
                self.backend.update_report_status(id, to).await?;
                info!(report = %id, ?to, "Report transitioned");
                Ok(())
            }
            (from, _) if from == to => Ok(()),
            _ => Err(RescueError::InvalidTransition(
                "reports only move open -> claimed -> resolved",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use refuge_backend::{MemoryBackend, Profile, ProfileStore};
    use refuge_shared::Role;

    const PARIS: GeoPoint = GeoPoint {
        latitude: 48.8566,
        longitude: 2.3522,
    };

    async fn seed_profile(backend: &MemoryBackend, role: Role) -> UserId {
        let user = UserId::new();
        backend
            .upsert_profile(&Profile {
                user,
                display_name: "someone".to_string(),
                avatar_url: None,
                role,
            })
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_file_and_list_open_reports() {
        let backend = Arc::new(MemoryBackend::new());
        let reporter = seed_profile(&backend, Role::Adopter).await;
        let desk = ReportDesk::new(backend.clone(), Some(reporter));

        let id = desk
            .file("injured cat near the station", PARIS, None)
            .await
            .unwrap()
            .unwrap();

        let open = desk.reports(Some(ReportStatus::Open)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, id);
        assert_eq!(open[0].location, PARIS);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_coordinates() {
        let backend = Arc::new(MemoryBackend::new());
        let reporter = seed_profile(&backend, Role::Adopter).await;
        let desk = ReportDesk::new(backend.clone(), Some(reporter));

        let bad = GeoPoint {
            latitude: 123.0,
            longitude: 2.0,
        };
        let err = desk.file("nope", bad, None).await.unwrap_err();
        assert!(matches!(err, RescueError::InvalidLocation { .. }));
        assert!(desk.reports(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_resolve_workflow() {
        let backend = Arc::new(MemoryBackend::new());
        let reporter = seed_profile(&backend, Role::Adopter).await;
        let volunteer = seed_profile(&backend, Role::Volunteer).await;

        let filing = ReportDesk::new(backend.clone(), Some(reporter));
        let id = filing.file("stray pup", PARIS, None).await.unwrap().unwrap();

        // The reporter (plain adopter) cannot claim.
        let err = filing.claim(id).await.unwrap_err();
        assert!(matches!(err, RescueError::Unauthorized(_)));

        let desk = ReportDesk::new(backend.clone(), Some(volunteer));
        desk.claim(id).await.unwrap();
        desk.resolve(id).await.unwrap();

        // Resolved is terminal.
        let err = desk.claim(id).await.unwrap_err();
        assert!(matches!(err, RescueError::InvalidTransition(_)));

        let resolved = desk.reports(Some(ReportStatus::Resolved)).await.unwrap();
        assert_eq!(resolved.len(), 1);
    }
}
