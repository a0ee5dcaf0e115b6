//! Background maintenance
//!
//! The expiry reaper consumes the expiry queue: ids whose expiry time has
//! passed and whose blob is gone are dropped from the geo index and from the
//! queue. Due ids whose blob is still alive move back to their real expiry. Nearby queries clean zombies on their own; the reaper also keeps
//! cluster and count queries from seeing expired intents.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Clock, IntentId};
use crate::repo::keys;
use crate::store::{KeyTtl, StoreClient, WriteBatch};
use crate::types::{NowhereError, Result};

/// Due entries examined per pass.
pub const DEFAULT_REAP_BATCH: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Queue entries past their expiry time
    pub due: usize,
    /// Entries removed from the geo index and queue
    pub reaped: usize,
    /// Due entries whose blob still exists (re-queued at their remaining lifetime)
    pub still_live: usize,
}

pub struct ExpiryReaper {
    store: StoreClient,
    clock: Arc<dyn Clock>,
    batch_limit: usize,
}

impl ExpiryReaper {
    pub fn new(store: StoreClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            batch_limit: DEFAULT_REAP_BATCH,
        }
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    /// Run one reaping pass.
    pub async fn reap_once(&self) -> Result<ReapReport> {
        let now = self.clock.now().timestamp() as f64;
        let due = self
            .store
            .zrange_by_score(keys::EXPIRY_QUEUE, f64::NEG_INFINITY, now, Some(self.batch_limit))
            .await?;
        if due.is_empty() {
            return Ok(ReapReport::default());
        }

        let blob_keys: Vec<String> = due
            .iter()
            .map(|member| match member.parse::<IntentId>() {
                Ok(id) => keys::intent(id),
                Err(_) => format!("intent:{}", member),
            })
            .collect();
        let blobs = self.store.mget(blob_keys.clone()).await?;

        let mut expired = Vec::new();
        let mut requeue = Vec::new();
        for ((member, key), blob) in due.iter().zip(&blob_keys).zip(&blobs) {
            if blob.is_none() {
                expired.push(member.clone());
                continue;
            }
            // Live entries move back to their real expiry
            let score = match self.store.ttl(key).await? {
                KeyTtl::Remaining(left) => now + left.as_secs_f64().ceil(),
                KeyTtl::Persistent => f64::INFINITY,
                KeyTtl::Missing => continue,
            };
            requeue.push((member.clone(), score));
        }
        let report = ReapReport {
            due: due.len(),
            reaped: expired.len(),
            still_live: due.len() - expired.len(),
        };

        if !expired.is_empty() || !requeue.is_empty() {
            let mut batch = WriteBatch::new();
            if !expired.is_empty() {
                batch.geo_remove(keys::GEO_INDEX, expired.clone());
                batch.zrem(keys::EXPIRY_QUEUE, expired);
            }
            for (member, score) in requeue {
                batch.zadd(keys::EXPIRY_QUEUE, member, score);
            }
            self.store
                .submit(batch)
                .await
                .map_err(NowhereError::from_commit_error)?;
        }

        debug!(due = report.due, reaped = report.reaped, still_live = report.still_live, "Reap pass");
        Ok(report)
    }
}

/// Spawn a background task that reaps expired intents periodically
pub fn spawn_reaper_task(reaper: Arc<ExpiryReaper>, interval: Duration) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Expiry reaper started");

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match reaper.reap_once().await {
                Ok(report) if report.reaped > 0 => {
                    info!(reaped = report.reaped, "Reaped expired intents");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Expiry reap failed"),
            }
        }
    })
}
