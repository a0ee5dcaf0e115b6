//! Membership repository

use tracing::debug;

use super::keys;
use super::Scoped;
use crate::domain::{ActorId, IntentId, JoinOutcome};
use crate::store::{
    scripts::JOIN_MISSING, Deferred, FromReply, Reply, Script, StoreClient, StoreError, StoreResult,
    WriteBatch,
};
use crate::types::{NowhereError, Result};

/// Raw result of the join script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinReply {
    Added,
    AlreadyMember,
    IntentMissing,
}

impl JoinReply {
    pub fn into_outcome(self, intent_id: IntentId) -> Result<JoinOutcome> {
        match self {
            Self::Added => Ok(JoinOutcome::Added),
            Self::AlreadyMember => Ok(JoinOutcome::AlreadyMember),
            Self::IntentMissing => Err(NowhereError::NotFound(format!("Intent {}", intent_id))),
        }
    }
}

impl FromReply for JoinReply {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Int(1) => Ok(Self::Added),
            Reply::Int(0) => Ok(Self::AlreadyMember),
            Reply::Int(n) if n == JOIN_MISSING => Ok(Self::IntentMissing),
            other => Err(StoreError::UnexpectedReply {
                expected: "join result",
                reply: format!("{:?}", other),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinRepository {
    store: StoreClient,
}

impl JoinRepository {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    fn join_script(intent_id: IntentId, actor: &ActorId) -> Script {
        Script::Join {
            intent_key: keys::intent(intent_id),
            joins_key: keys::joins(intent_id),
            member: actor.to_string(),
        }
    }

    /// Stage an atomic join.
    pub fn stage_join(&self, batch: &mut WriteBatch, intent_id: IntentId, actor: &ActorId) -> Deferred<JoinReply> {
        batch.eval(Self::join_script(intent_id, actor))
    }

    /// Join immediately, outside any unit of work.
    pub async fn join_now(&self, intent_id: IntentId, actor: &ActorId) -> Result<JoinOutcome> {
        let reply: JoinReply = self.store.eval(Self::join_script(intent_id, actor)).await?;
        let outcome = reply.into_outcome(intent_id)?;
        debug!(intent_id = %intent_id, actor = %actor, outcome = ?outcome, "Join applied");
        Ok(outcome)
    }

    /// Live membership cardinality.
    pub async fn count(&self, intent_id: IntentId) -> Result<u64> {
        Ok(self.store.scard(&keys::joins(intent_id)).await? as u64)
    }

    pub async fn is_member(&self, intent_id: IntentId, actor: &ActorId) -> Result<bool> {
        Ok(self
            .store
            .sismember(&keys::joins(intent_id), actor.as_str())
            .await?)
    }

    /// Members in ascending order.
    pub async fn members(&self, intent_id: IntentId) -> Result<Vec<ActorId>> {
        Ok(self
            .store
            .smembers(&keys::joins(intent_id))
            .await?
            .into_iter()
            .map(ActorId::from)
            .collect())
    }
}

impl Scoped<'_, JoinRepository> {
    pub fn join(&mut self, intent_id: IntentId, actor: &ActorId) -> Deferred<JoinReply> {
        self.repo.stage_join(self.batch, intent_id, actor)
    }
}
