//! Domain model structs as stored in the hosted platform's collections.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer over IPC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use refuge_shared::{ApplicationId, ConversationId, MessageId, PetId, ReportId, Role, UserId};

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A two-party message thread.
///
/// `last_message` / `last_message_at` are denormalized caches refreshed on
/// every send so the inbox can sort and preview without a per-row query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// First participant (the identity that sent the opening message).
    pub participant_a: UserId,
    /// Second participant.
    pub participant_b: UserId,
    /// Body of the most recent message, if any.
    pub last_message: Option<String>,
    /// Timestamp of the most recent message, if any.
    pub last_message_at: Option<DateTime<Utc>>,
    /// When the conversation row was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a fresh conversation between two identities.
    pub fn between(a: UserId, b: UserId) -> Self {
        Self {
            id: ConversationId::new(),
            participant_a: a,
            participant_b: b,
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.participant_a == user || self.participant_b == user
    }

    /// The counterpart of `user`, or `None` if `user` is not a participant.
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if self.participant_a == user {
            Some(self.participant_b)
        } else if self.participant_b == user {
            Some(self.participant_a)
        } else {
            None
        }
    }

    /// Most-recent-activity timestamp used for inbox ordering.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Identity of the author.
    pub sender: UserId,
    /// Plaintext body.
    pub body: String,
    /// When the message was sent, as assigned by the sending client.
    /// Clock skew between devices can reorder threads; accepted trade-off.
    pub sent_at: DateTime<Utc>,
    /// Whether the recipient has viewed the message. One-way false -> true.
    pub read: bool,
    /// When the read flag flipped, if it has.
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Build an unread message stamped with the sender's current clock.
    pub fn new(conversation_id: ConversationId, sender: UserId, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender,
            body: body.into(),
            sent_at: Utc::now(),
            read: false,
            read_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Display profile for an identity. Owned by the account subsystem;
/// read-only from the chat and rescue flows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Identity this profile belongs to.
    pub user: UserId,
    /// Human-readable display name.
    pub display_name: String,
    /// URL of the avatar image in the platform's storage bucket.
    pub avatar_url: Option<String>,
    /// Account role.
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Pet listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Other,
}

/// Adoption status of a listed pet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    Available,
    PendingAdoption,
    Adopted,
}

/// A pet posted for adoption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PetListing {
    /// Unique listing identifier.
    pub id: PetId,
    /// The pet's name.
    pub name: String,
    pub species: Species,
    /// Breed, when known.
    pub breed: Option<String>,
    /// Approximate age in months, when known.
    pub age_months: Option<u32>,
    /// Free-text description shown on the listing.
    pub description: String,
    /// URL of the primary photo in the platform's storage bucket.
    pub photo_url: Option<String>,
    /// Identity of the rescuer who posted the listing.
    pub posted_by: UserId,
    pub status: PetStatus,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Stray report
// ---------------------------------------------------------------------------

/// A GPS coordinate pair reported from the reporter's device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Claimed,
    Resolved,
}

/// A sighting of a stray animal, filed with the reporter's location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrayReport {
    /// Unique report identifier.
    pub id: ReportId,
    /// Identity of the reporter.
    pub reporter: UserId,
    /// What was seen, condition of the animal, etc.
    pub description: String,
    /// URL of an optional photo in the platform's storage bucket.
    pub photo_url: Option<String>,
    /// Where the animal was sighted.
    pub location: GeoPoint,
    pub status: ReportStatus,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Adoption application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Approved,
    Rejected,
}

/// An adopter's application for a listed pet, reviewed by a volunteer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdoptionApplication {
    /// Unique application identifier.
    pub id: ApplicationId,
    /// The pet applied for.
    pub pet_id: PetId,
    /// Identity of the applicant.
    pub applicant: UserId,
    /// Free-text message to the rescuer.
    pub message: String,
    pub status: ApplicationStatus,
    /// Volunteer or admin who approved/rejected, once reviewed.
    pub reviewed_by: Option<UserId>,
    /// When the application was submitted.
    pub created_at: DateTime<Utc>,
}
