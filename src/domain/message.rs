//! Message value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActorId, IntentId, MessageId};
use crate::types::{NowhereError, Result};

/// Maximum message length in characters.
pub const CONTENT_MAX_CHARS: usize = 500;

/// Ephemeral chat line attached to an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    intent_id: IntentId,
    #[serde(rename = "user_id")]
    author: ActorId,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Validate content and build a new message.
    pub fn create(
        intent_id: IntentId,
        author: ActorId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(NowhereError::Validation("Message cannot be empty".into()));
        }
        if content.chars().count() > CONTENT_MAX_CHARS {
            return Err(NowhereError::Validation(format!(
                "Message content too long (max {} chars)",
                CONTENT_MAX_CHARS
            )));
        }

        Ok(Self {
            id: MessageId::new(),
            intent_id,
            author,
            content,
            created_at,
        })
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn intent_id(&self) -> IntentId {
        self.intent_id
    }

    pub fn author(&self) -> &ActorId {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_entry(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_entry(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_bounds() {
        let intent = IntentId::new();
        let now = Utc::now();
        assert!(Message::create(intent, "a".into(), "hi", now).is_ok());
        assert!(Message::create(intent, "a".into(), "x".repeat(500), now).is_ok());
        assert!(Message::create(intent, "a".into(), "x".repeat(501), now).is_err());
        assert!(Message::create(intent, "a".into(), "  \n", now).is_err());
    }

    #[test]
    fn test_entry_roundtrip() {
        let msg = Message::create(IntentId::new(), "bob".into(), "on my way", Utc::now()).unwrap();
        let raw = msg.to_entry().unwrap();
        assert!(raw.contains(r#""user_id":"bob""#));
        assert_eq!(Message::from_entry(&raw).unwrap(), msg);
    }
}
