//! Async store traits describing the platform's row-level API surface.
//!
//! Each trait groups the operations of one screen family. They are
//! object-safe so the whole surface can travel as an `Arc<dyn Backend>`,
//! injected into the chat and rescue components.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use refuge_shared::{ApplicationId, ConversationId, PetId, ReportId, UserId};

use crate::error::Result;
use crate::models::{
    AdoptionApplication, ApplicationStatus, Conversation, Message, PetListing, PetStatus, Profile,
    ReportStatus, StrayReport,
};
use crate::realtime::Realtime;

/// Conversation and message collections.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// All conversations involving `user`, in no particular order.
    async fn conversations_for(&self, user: UserId) -> Result<Vec<Conversation>>;

    /// Fetch a single conversation. `NotFound` if none exists.
    async fn conversation(&self, id: ConversationId) -> Result<Conversation>;

    /// The existing conversation between two identities, if any.
    /// Participant order does not matter.
    async fn conversation_between(&self, a: UserId, b: UserId) -> Result<Option<Conversation>>;

    /// Insert a new conversation row.
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Refresh the denormalized summary cache after a send.
    async fn update_conversation_summary(
        &self,
        id: ConversationId,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a conversation and, by cascade, its messages.
    /// Returns `true` if a row was deleted.
    async fn delete_conversation(&self, id: ConversationId) -> Result<bool>;

    /// Messages of a conversation ordered by `sent_at` ascending,
    /// capped at `limit`.
    async fn messages_for(&self, conversation: ConversationId, limit: u32)
        -> Result<Vec<Message>>;

    /// The most recent message of a conversation (`sent_at` descending,
    /// limit one).
    async fn latest_message(&self, conversation: ConversationId) -> Result<Option<Message>>;

    /// Count of messages in `conversation` authored by someone other than
    /// `viewer` with `read = false`.
    async fn count_unread(&self, conversation: ConversationId, viewer: UserId) -> Result<u64>;

    /// Insert a new message row.
    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Mark every unread message in `conversation` not authored by `viewer`
    /// as read at `at`. Returns the number of rows changed; calling again
    /// immediately returns zero and is not an error.
    async fn mark_read(
        &self,
        conversation: ConversationId,
        viewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64>;
}

/// Display profiles, owned by the account subsystem.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for an identity. `NotFound` if none exists.
    async fn profile(&self, user: UserId) -> Result<Profile>;

    /// Insert or replace a profile row.
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
}

/// Pet listings, stray reports, and adoption applications.
#[async_trait]
pub trait RescueStore: Send + Sync {
    /// All pet listings, newest first.
    async fn list_pets(&self) -> Result<Vec<PetListing>>;

    async fn insert_pet(&self, pet: &PetListing) -> Result<()>;

    /// Fetch a single listing. `NotFound` if none exists.
    async fn pet(&self, id: PetId) -> Result<PetListing>;

    async fn update_pet_status(&self, id: PetId, status: PetStatus) -> Result<()>;

    /// Stray reports, newest first, optionally filtered by status.
    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<StrayReport>>;

    async fn insert_report(&self, report: &StrayReport) -> Result<()>;

    async fn update_report_status(&self, id: ReportId, status: ReportStatus) -> Result<()>;

    /// Applications filed for one pet, oldest first.
    async fn applications_for_pet(&self, pet: PetId) -> Result<Vec<AdoptionApplication>>;

    /// Fetch a single application. `NotFound` if none exists.
    async fn application(&self, id: ApplicationId) -> Result<AdoptionApplication>;

    async fn insert_application(&self, application: &AdoptionApplication) -> Result<()>;

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        reviewer: UserId,
    ) -> Result<()>;
}

/// The full client surface of the hosted platform.
pub trait Backend: ChatStore + ProfileStore + RescueStore + Realtime {}

impl<T: ChatStore + ProfileStore + RescueStore + Realtime> Backend for T {}
