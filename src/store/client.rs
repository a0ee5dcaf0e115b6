//! Typed client over a [`Backend`]

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::batch::{CommitReceipt, WriteBatch};
use super::command::{Command, FromReply, KeyTtl};
use super::error::StoreResult;
use super::geo::{GeoHit, GeoPoint};
use super::scripts::Script;
use super::Backend;

/// Live handle on the store.
///
/// Cloning is cheap; all clones share the same backend. Reads through a
/// client always observe committed state.
#[derive(Clone)]
pub struct StoreClient {
    backend: Arc<dyn Backend>,
}

impl StoreClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn call<T: FromReply>(&self, command: Command) -> StoreResult<T> {
        let reply = self.backend.query(command).await?;
        T::from_reply(reply)
    }

    /// Submit a batch as one all-or-nothing unit.
    pub async fn submit(&self, batch: WriteBatch) -> StoreResult<CommitReceipt> {
        let size = batch.len();
        let replies = self.backend.exec(batch.into_commands()).await?;
        debug!(commands = size, "Batch submitted");
        Ok(CommitReceipt::new(replies))
    }

    // =========================================================================
    // Blobs
    // =========================================================================

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.call(Command::Get { key: key.to_string() }).await
    }

    pub async fn mget(&self, keys: Vec<String>) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.call(Command::MGet { keys }).await
    }

    pub async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        self.call(Command::Set {
            key: key.to_string(),
            value,
            ttl,
        })
        .await
    }

    pub async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.call(Command::Ttl { key: key.to_string() }).await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.call(Command::Expire {
            key: key.to_string(),
            ttl,
        })
        .await
    }

    // =========================================================================
    // Geo index
    // =========================================================================

    pub async fn geo_add(&self, key: &str, member: &str, point: GeoPoint) -> StoreResult<bool> {
        self.call(Command::GeoAdd {
            key: key.to_string(),
            member: member.to_string(),
            point,
        })
        .await
    }

    /// Members within `radius_km` of `center`, nearest first.
    pub async fn geo_search(
        &self,
        key: &str,
        center: GeoPoint,
        radius_km: f64,
        count: Option<usize>,
    ) -> StoreResult<Vec<GeoHit>> {
        self.call(Command::GeoSearch {
            key: key.to_string(),
            center,
            radius_km,
            count,
        })
        .await
    }

    pub async fn geo_remove(&self, key: &str, members: Vec<String>) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        self.call(Command::GeoRemove {
            key: key.to_string(),
            members,
        })
        .await
    }

    // =========================================================================
    // Sets
    // =========================================================================

    pub async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.call(Command::SAdd {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await
    }

    pub async fn srem(&self, key: &str, members: Vec<String>) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        self.call(Command::SRem {
            key: key.to_string(),
            members,
        })
        .await
    }

    pub async fn scard(&self, key: &str) -> StoreResult<usize> {
        self.call(Command::SCard { key: key.to_string() }).await
    }

    /// Cardinalities of several sets in one round trip.
    pub async fn scard_many(&self, keys: Vec<String>) -> StoreResult<Vec<usize>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let commands = keys.into_iter().map(|key| Command::SCard { key }).collect();
        self.backend
            .exec(commands)
            .await?
            .into_iter()
            .map(usize::from_reply)
            .collect()
    }

    pub async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.call(Command::SIsMember {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await
    }

    pub async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.call(Command::SMembers { key: key.to_string() }).await
    }

    // =========================================================================
    // Sorted sets
    // =========================================================================

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<bool> {
        self.call(Command::ZAdd {
            key: key.to_string(),
            member: member.to_string(),
            score,
        })
        .await
    }

    /// Members with `min <= score <= max`, lowest score first.
    pub async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        self.call(Command::ZRangeByScore {
            key: key.to_string(),
            min,
            max,
            limit,
        })
        .await
    }

    // =========================================================================
    // Lists
    // =========================================================================

    pub async fn rpush(&self, key: &str, value: String) -> StoreResult<usize> {
        self.call(Command::RPush {
            key: key.to_string(),
            value,
        })
        .await
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        self.call(Command::LRange {
            key: key.to_string(),
            start,
            stop,
        })
        .await
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Run a script as one atomic step.
    pub async fn eval<T: FromReply>(&self, script: Script) -> StoreResult<T> {
        self.call(Command::Eval(script)).await
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient").finish_non_exhaustive()
    }
}
