//! Write commands handled by the intent service

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ActorId, IntentId};

#[derive(Debug, Clone)]
pub struct CreateIntent {
    pub command_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub owner: ActorId,
    pub title: String,
    pub emoji: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CreateIntent {
    pub fn new(
        owner: impl Into<ActorId>,
        title: impl Into<String>,
        emoji: impl Into<String>,
        latitude: f64,
        longitude: f64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            issued_at,
            owner: owner.into(),
            title: title.into(),
            emoji: emoji.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinIntent {
    pub command_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub actor: ActorId,
}

impl JoinIntent {
    pub fn new(intent_id: IntentId, actor: impl Into<ActorId>, issued_at: DateTime<Utc>) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            issued_at,
            intent_id,
            actor: actor.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostMessage {
    pub command_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub author: ActorId,
    pub content: String,
}

impl PostMessage {
    pub fn new(
        intent_id: IntentId,
        author: impl Into<ActorId>,
        content: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            issued_at,
            intent_id,
            author: author.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlagIntent {
    pub command_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub intent_id: IntentId,
}

impl FlagIntent {
    pub fn new(intent_id: IntentId, issued_at: DateTime<Utc>) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            issued_at,
            intent_id,
        }
    }
}
