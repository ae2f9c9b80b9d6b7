//! In-process implementation of the backend surface.
//!
//! `MemoryBackend` keeps every collection in `RwLock`-guarded maps and emits
//! realtime events on message inserts and read-flag updates, mirroring what
//! the hosted platform does server-side. Tests and local development run
//! against it; production wires the same traits to the platform SDK.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use refuge_shared::{ApplicationId, ConversationId, PetId, ReportId, UserId};

use crate::api::{ChatStore, ProfileStore, RescueStore};
use crate::error::{BackendError, Result};
use crate::models::{
    AdoptionApplication, ApplicationStatus, Conversation, Message, PetListing, PetStatus, Profile,
    ReportStatus, StrayReport,
};
use crate::realtime::{ChangeEvent, ChangeKind, ChannelScope, Realtime, RealtimeHub, Subscription};

/// In-memory backend with realtime fan-out and a fault-injection switch.
pub struct MemoryBackend {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    /// Messages grouped by owning conversation, in insertion order.
    messages: RwLock<HashMap<ConversationId, Vec<Message>>>,
    profiles: RwLock<HashMap<UserId, Profile>>,
    pets: RwLock<HashMap<PetId, PetListing>>,
    reports: RwLock<HashMap<ReportId, StrayReport>>,
    applications: RwLock<HashMap<ApplicationId, AdoptionApplication>>,
    hub: Arc<RealtimeHub>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            pets: RwLock::new(HashMap::new()),
            reports: RwLock::new(HashMap::new()),
            applications: RwLock::new(HashMap::new()),
            hub: RealtimeHub::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate a network outage: every store call fails with a connection
    /// error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live realtime subscriptions (teardown assertions in tests).
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Connection("simulated outage".into()))
        } else {
            Ok(())
        }
    }

    fn publish(&self, kind: ChangeKind, message: Message, conversation: &Conversation) {
        self.hub.publish(ChangeEvent {
            kind,
            message,
            participants: [conversation.participant_a, conversation.participant_b],
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for MemoryBackend {
    async fn conversations_for(&self, user: UserId) -> Result<Vec<Conversation>> {
        self.ensure_online()?;
        let conversations = self.conversations.read().await;
        Ok(conversations
            .values()
            .filter(|c| c.involves(user))
            .cloned()
            .collect())
    }

    async fn conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.ensure_online()?;
        let conversations = self.conversations.read().await;
        conversations.get(&id).cloned().ok_or(BackendError::NotFound)
    }

    async fn conversation_between(&self, a: UserId, b: UserId) -> Result<Option<Conversation>> {
        self.ensure_online()?;
        let conversations = self.conversations.read().await;
        Ok(conversations
            .values()
            .find(|c| c.involves(a) && c.involves(b) && a != b)
            .cloned())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.ensure_online()?;
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(BackendError::Rejected("duplicate conversation id".into()));
        }
        conversations.insert(conversation.id, conversation.clone());
        debug!(conversation = %conversation.id, "Conversation created");
        Ok(())
    }

    async fn update_conversation_summary(
        &self,
        id: ConversationId,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_online()?;
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(&id).ok_or(BackendError::NotFound)?;
        conversation.last_message = Some(last_message.to_string());
        conversation.last_message_at = Some(at);
        Ok(())
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<bool> {
        self.ensure_online()?;
        let removed = self.conversations.write().await.remove(&id);
        let Some(conversation) = removed else {
            return Ok(false);
        };

        // Cascade: the platform deletes the conversation's messages with it.
        let cascade = self.messages.write().await.remove(&id).unwrap_or_default();
        for message in cascade {
            self.publish(ChangeKind::Delete, message, &conversation);
        }
        debug!(conversation = %id, "Conversation deleted");
        Ok(true)
    }

    async fn messages_for(
        &self,
        conversation: ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.ensure_online()?;
        let messages = self.messages.read().await;
        let mut rows: Vec<Message> = messages.get(&conversation).cloned().unwrap_or_default();
        rows.sort_by_key(|m| m.sent_at);

        // Keep the most recent `limit` rows, still ascending.
        let excess = rows.len().saturating_sub(limit as usize);
        Ok(rows.split_off(excess))
    }

    async fn latest_message(&self, conversation: ConversationId) -> Result<Option<Message>> {
        self.ensure_online()?;
        let messages = self.messages.read().await;
        Ok(messages
            .get(&conversation)
            .and_then(|rows| rows.iter().max_by_key(|m| m.sent_at))
            .cloned())
    }

    async fn count_unread(&self, conversation: ConversationId, viewer: UserId) -> Result<u64> {
        self.ensure_online()?;
        let messages = self.messages.read().await;
        Ok(messages
            .get(&conversation)
            .map(|rows| {
                rows.iter()
                    .filter(|m| m.sender != viewer && !m.read)
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.ensure_online()?;
        let conversation = {
            let conversations = self.conversations.read().await;
            conversations
                .get(&message.conversation_id)
                .cloned()
                .ok_or_else(|| BackendError::Rejected("unknown conversation".into()))?
        };

        {
            let mut messages = self.messages.write().await;
            let rows = messages.entry(message.conversation_id).or_default();
            if rows.iter().any(|m| m.id == message.id) {
                return Err(BackendError::Rejected("duplicate message id".into()));
            }
            rows.push(message.clone());
        }

        self.publish(ChangeKind::Insert, message.clone(), &conversation);
        Ok(())
    }

    async fn mark_read(
        &self,
        conversation: ConversationId,
        viewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        self.ensure_online()?;
        let conv = {
            let conversations = self.conversations.read().await;
            conversations
                .get(&conversation)
                .cloned()
                .ok_or(BackendError::NotFound)?
        };

        let changed: Vec<Message> = {
            let mut messages = self.messages.write().await;
            let rows = messages.entry(conversation).or_default();
            rows.iter_mut()
                .filter(|m| m.sender != viewer && !m.read)
                .map(|m| {
                    m.read = true;
                    m.read_at = Some(at);
                    m.clone()
                })
                .collect()
        };

        let count = changed.len() as u64;
        for message in changed {
            self.publish(ChangeKind::Update, message, &conv);
        }
        Ok(count)
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn profile(&self, user: UserId) -> Result<Profile> {
        self.ensure_online()?;
        let profiles = self.profiles.read().await;
        profiles.get(&user).cloned().ok_or(BackendError::NotFound)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.ensure_online()?;
        self.profiles
            .write()
            .await
            .insert(profile.user, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl RescueStore for MemoryBackend {
    async fn list_pets(&self) -> Result<Vec<PetListing>> {
        self.ensure_online()?;
        let pets = self.pets.read().await;
        let mut rows: Vec<PetListing> = pets.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_pet(&self, pet: &PetListing) -> Result<()> {
        self.ensure_online()?;
        let mut pets = self.pets.write().await;
        if pets.contains_key(&pet.id) {
            return Err(BackendError::Rejected("duplicate pet id".into()));
        }
        pets.insert(pet.id, pet.clone());
        Ok(())
    }

    async fn pet(&self, id: PetId) -> Result<PetListing> {
        self.ensure_online()?;
        let pets = self.pets.read().await;
        pets.get(&id).cloned().ok_or(BackendError::NotFound)
    }

    async fn update_pet_status(&self, id: PetId, status: PetStatus) -> Result<()> {
        self.ensure_online()?;
        let mut pets = self.pets.write().await;
        let pet = pets.get_mut(&id).ok_or(BackendError::NotFound)?;
        pet.status = status;
        Ok(())
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<StrayReport>> {
        self.ensure_online()?;
        let reports = self.reports.read().await;
        let mut rows: Vec<StrayReport> = reports
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_report(&self, report: &StrayReport) -> Result<()> {
        self.ensure_online()?;
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.id) {
            return Err(BackendError::Rejected("duplicate report id".into()));
        }
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn update_report_status(&self, id: ReportId, status: ReportStatus) -> Result<()> {
        self.ensure_online()?;
        let mut reports = self.reports.write().await;
        let report = reports.get_mut(&id).ok_or(BackendError::NotFound)?;
        report.status = status;
        Ok(())
    }

    async fn applications_for_pet(&self, pet: PetId) -> Result<Vec<AdoptionApplication>> {
        self.ensure_online()?;
        let applications = self.applications.read().await;
        let mut rows: Vec<AdoptionApplication> = applications
            .values()
            .filter(|a| a.pet_id == pet)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn application(&self, id: ApplicationId) -> Result<AdoptionApplication> {
        self.ensure_online()?;
        let applications = self.applications.read().await;
        applications.get(&id).cloned().ok_or(BackendError::NotFound)
    }

    async fn insert_application(&self, application: &AdoptionApplication) -> Result<()> {
        self.ensure_online()?;
        let mut applications = self.applications.write().await;
        if applications.contains_key(&application.id) {
            return Err(BackendError::Rejected("duplicate application id".into()));
        }
        applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        reviewer: UserId,
    ) -> Result<()> {
        self.ensure_online()?;
        let mut applications = self.applications.write().await;
        let application = applications.get_mut(&id).ok_or(BackendError::NotFound)?;
        application.status = status;
        application.reviewed_by = Some(reviewer);
        Ok(())
    }
}

impl Realtime for MemoryBackend {
    fn subscribe(&self, scope: ChannelScope) -> Result<Subscription> {
        self.ensure_online()
            .map_err(|_| BackendError::Channel("transport unreachable".into()))?;
        Ok(self.hub.subscribe(scope))
    }
}
