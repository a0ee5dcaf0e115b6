//! Content policy boundary
//!
//! Use cases ask a [`ContentPolicy`] before accepting user text (intent
//! titles, messages). The real checker lives outside this crate.

use async_trait::async_trait;

use crate::domain::ActorId;
use crate::types::{NowhereError, Result};

/// Verdict on a piece of user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Accept,
    Reject(String),
}

impl PolicyDecision {
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(reason) => Err(NowhereError::PolicyRejected(reason)),
        }
    }
}

#[async_trait]
pub trait ContentPolicy: Send + Sync {
    async fn review(&self, actor: &ActorId, text: &str) -> PolicyDecision;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ContentPolicy for AllowAll {
    async fn review(&self, _actor: &ActorId, _text: &str) -> PolicyDecision {
        PolicyDecision::Accept
    }
}
