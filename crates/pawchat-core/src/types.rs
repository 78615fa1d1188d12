use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Numeric account identifier used by the remote store for users and admins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque message identifier.
///
/// Server-assigned for persisted messages, a UUID for anything created locally.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a fresh local identifier.
    pub fn local() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Remote conversation thread identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Which side of the conversation authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    /// The end user running this client.
    User,
    /// The fixed counterpart: the clinic admin or the local assistant.
    Counterpart,
}

/// Where a message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Stored in (or on its way to) the remote conversation store.
    Persisted,
    /// Generated locally by the assistant and never persisted.
    Assisted,
}

/// Delivery progress of a locally inserted persisted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// The save call has not resolved yet.
    Pending,
    /// The remote store acknowledged the message.
    Sent,
    /// The save call failed; the message is only visible locally.
    Failed,
}

/// Chat mode governing message visibility and send behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Replies come from the local intent matcher.
    Assisted,
    /// Messages are persisted and answered by a human counterpart.
    #[default]
    HumanRelayed,
}

impl ChatMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ChatMode::Assisted => ChatMode::HumanRelayed,
            ChatMode::HumanRelayed => ChatMode::Assisted,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Assisted => f.write_str("assisted"),
            ChatMode::HumanRelayed => f.write_str("human_relayed"),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A single entry of the chat timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: String,
    pub sender: SenderRole,
    pub provenance: Provenance,
    /// Absent for assisted exchanges.
    pub timestamp: Option<DateTime<Utc>>,
    pub conversation_id: Option<ConversationId>,
    /// Only set on optimistic local copies of persisted messages.
    pub delivery: Option<DeliveryState>,
}

impl Message {
    /// A locally generated assisted-mode message.
    pub fn assisted(sender: SenderRole, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            body: body.into(),
            sender,
            provenance: Provenance::Assisted,
            timestamp: None,
            conversation_id: None,
            delivery: None,
        }
    }

    /// An optimistic user message awaiting remote persistence.
    pub fn optimistic(
        body: impl Into<String>,
        conversation_id: ConversationId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::local(),
            body: body.into(),
            sender: SenderRole::User,
            provenance: Provenance::Persisted,
            timestamp: Some(timestamp),
            conversation_id: Some(conversation_id),
            delivery: Some(DeliveryState::Pending),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.provenance == Provenance::Persisted
    }

    pub fn is_assisted(&self) -> bool {
        self.provenance == Provenance::Assisted
    }

    /// True for local copies that have not been replaced by the server's record.
    pub fn is_optimistic(&self) -> bool {
        self.delivery.is_some()
    }

    /// A copy of this message carrying a new delivery state.
    pub fn with_delivery(&self, state: DeliveryState) -> Self {
        Self {
            delivery: Some(state),
            ..self.clone()
        }
    }
}

/// A remote conversation thread between the user and the counterpart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant: UserId,
    pub counterpart: UserId,
    pub created_at: DateTime<Utc>,
}

/// An entry of the admin roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
