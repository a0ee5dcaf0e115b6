//! Message repository
//!
//! Messages live in a bounded list per intent that shares the intent's TTL.

use super::keys;
use super::{Scoped, StoreConfig};
use crate::domain::{IntentId, Message};
use crate::store::{Deferred, KeyTtl, StoreClient, WriteBatch};
use crate::types::Result;

#[derive(Debug, Clone)]
pub struct MessageRepository {
    store: StoreClient,
    config: StoreConfig,
}

impl MessageRepository {
    pub fn new(store: StoreClient, config: StoreConfig) -> Self {
        Self { store, config }
    }

    /// Stage an append.
    ///
    /// The batch is guarded on the parent intent still existing at commit,
    /// the list is trimmed to the configured history and takes the parent's
    /// remaining TTL (`parent_ttl`, read live by the caller).
    pub fn stage_append(
        &self,
        batch: &mut WriteBatch,
        message: &Message,
        parent_ttl: KeyTtl,
    ) -> Result<Deferred<usize>> {
        let intent_id = message.intent_id();
        let list_key = keys::messages(intent_id);
        let history = self.config.message_history.max(1) as isize;

        batch.require_exists(keys::intent(intent_id));
        let length = batch.rpush(list_key.clone(), message.to_entry()?);
        batch.ltrim(list_key.clone(), -history, -1);
        if let Some(remaining) = parent_ttl.remaining() {
            batch.expire(list_key, remaining);
        }
        Ok(length)
    }

    /// The most recent `limit` messages, oldest first.
    pub async fn recent(&self, intent_id: IntentId, limit: usize) -> Result<Vec<Message>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let start = -(limit.min(isize::MAX as usize) as isize);
        self.store
            .lrange(&keys::messages(intent_id), start, -1)
            .await?
            .iter()
            .map(|raw| Message::from_entry(raw))
            .collect()
    }
}

impl Scoped<'_, MessageRepository> {
    pub fn append(&mut self, message: &Message, parent_ttl: KeyTtl) -> Result<Deferred<usize>> {
        self.repo.stage_append(self.batch, message, parent_ttl)
    }
}
