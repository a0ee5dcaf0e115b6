//! Domain events
//!
//! Facts about committed state changes. Use cases collect them inside a
//! unit of work; the bus only sees them after the batch has landed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{ActorId, Intent, IntentId, Message, MessageId};

/// Event variant tag used to key bus subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    IntentCreated,
    IntentJoined,
    MessagePosted,
    IntentFlagged,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        Self::IntentCreated,
        Self::IntentJoined,
        Self::MessagePosted,
        Self::IntentFlagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentCreated => "intent_created",
            Self::IntentJoined => "intent_joined",
            Self::MessagePosted => "message_posted",
            Self::IntentFlagged => "intent_flagged",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentCreated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub owner: Option<ActorId>,
    pub title: String,
    pub emoji: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_system: bool,
}

impl IntentCreated {
    pub fn from_intent(intent: &Intent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            intent_id: intent.id(),
            owner: intent.owner().cloned(),
            title: intent.title().to_string(),
            emoji: intent.emoji().to_string(),
            latitude: intent.latitude(),
            longitude: intent.longitude(),
            is_system: intent.is_system(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentJoined {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub actor: ActorId,
}

impl IntentJoined {
    pub fn new(intent_id: IntentId, actor: ActorId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            intent_id,
            actor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePosted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub message_id: MessageId,
    pub intent_id: IntentId,
    pub author: ActorId,
    pub content_length: usize,
}

impl MessagePosted {
    pub fn from_message(message: &Message, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            message_id: message.id(),
            intent_id: message.intent_id(),
            author: message.author().clone(),
            content_length: message.content().chars().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentFlagged {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub flag_count: u64,
    /// Whether the intent is hidden from discovery after this flag
    pub hidden: bool,
    /// Set only on the flag that reached the threshold
    pub newly_hidden: bool,
}

impl IntentFlagged {
    /// Flag event for `flag_count` flags against a hiding `threshold`.
    pub fn new(intent_id: IntentId, flag_count: u64, threshold: u64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            intent_id,
            flag_count,
            hidden: flag_count >= threshold,
            newly_hidden: flag_count == threshold,
        }
    }
}

/// Any domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    IntentCreated(IntentCreated),
    IntentJoined(IntentJoined),
    MessagePosted(MessagePosted),
    IntentFlagged(IntentFlagged),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::IntentCreated(_) => EventKind::IntentCreated,
            Self::IntentJoined(_) => EventKind::IntentJoined,
            Self::MessagePosted(_) => EventKind::MessagePosted,
            Self::IntentFlagged(_) => EventKind::IntentFlagged,
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            Self::IntentCreated(e) => e.event_id,
            Self::IntentJoined(e) => e.event_id,
            Self::MessagePosted(e) => e.event_id,
            Self::IntentFlagged(e) => e.event_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::IntentCreated(e) => e.occurred_at,
            Self::IntentJoined(e) => e.occurred_at,
            Self::MessagePosted(e) => e.occurred_at,
            Self::IntentFlagged(e) => e.occurred_at,
        }
    }

    pub fn intent_id(&self) -> IntentId {
        match self {
            Self::IntentCreated(e) => e.intent_id,
            Self::IntentJoined(e) => e.intent_id,
            Self::MessagePosted(e) => e.intent_id,
            Self::IntentFlagged(e) => e.intent_id,
        }
    }
}

impl From<IntentCreated> for DomainEvent {
    fn from(e: IntentCreated) -> Self {
        Self::IntentCreated(e)
    }
}

impl From<IntentJoined> for DomainEvent {
    fn from(e: IntentJoined) -> Self {
        Self::IntentJoined(e)
    }
}

impl From<MessagePosted> for DomainEvent {
    fn from(e: MessagePosted) -> Self {
        Self::MessagePosted(e)
    }
}

impl From<IntentFlagged> for DomainEvent {
    fn from(e: IntentFlagged) -> Self {
        Self::IntentFlagged(e)
    }
}
