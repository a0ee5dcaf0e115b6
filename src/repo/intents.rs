//! Intent repository
//!
//! Owns the intent blob, the geo index, the expiry queue and the per-owner
//! index. Proximity and overview queries read straight from the store.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::keys;
use super::{Scoped, StoreConfig};
use crate::discovery::{self, Cluster, RankedIntent, RankingConfig};
use crate::domain::{ActorId, Intent, IntentId};
use crate::store::{Deferred, GeoPoint, KeyTtl, Script, StoreClient, WriteBatch};
use crate::types::{NowhereError, Result};

/// Upper bound on a raw proximity count.
pub const COUNT_NEARBY_CAP: usize = 100;

#[derive(Debug, Clone)]
pub struct IntentRepository {
    store: StoreClient,
    config: StoreConfig,
    ranking: RankingConfig,
}

impl IntentRepository {
    pub fn new(store: StoreClient, config: StoreConfig, ranking: RankingConfig) -> Self {
        Self {
            store,
            config,
            ranking,
        }
    }

    pub fn ranking(&self) -> &RankingConfig {
        &self.ranking
    }

    // =========================================================================
    // Staged writes
    // =========================================================================

    /// Stage an intent save: blob with TTL, geo entry, expiry queue entry
    /// and owner index.
    pub fn stage_save(
        &self,
        batch: &mut WriteBatch,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> Result<Deferred<()>> {
        let id = intent.id();
        let ttl = self.config.intent_ttl;
        let member = id.to_string();

        let saved = batch.set(keys::intent(id), intent.to_blob()?, Some(ttl));
        batch.geo_add(keys::GEO_INDEX, member.clone(), intent.location());

        let expires_at = now.timestamp() as f64 + ttl.as_secs_f64();
        batch.zadd(keys::EXPIRY_QUEUE, member.clone(), expires_at);

        if let Some(owner) = intent.owner() {
            let owner_key = keys::owner_intents(owner);
            batch.sadd(owner_key.clone(), member);
            batch.expire(owner_key, ttl);
        }

        Ok(saved)
    }

    /// Stage an atomic flag. Resolves to the new count, or 0 when the
    /// intent is gone.
    pub fn stage_flag(&self, batch: &mut WriteBatch, id: IntentId) -> Deferred<u64> {
        batch.eval(self.flag_script(id))
    }

    fn flag_script(&self, id: IntentId) -> Script {
        Script::Flag {
            intent_key: keys::intent(id),
            geo_key: keys::GEO_INDEX.to_string(),
            member: id.to_string(),
            increment: 1,
            hide_at: i64::try_from(self.ranking.flag_threshold).unwrap_or(i64::MAX),
        }
    }

    // =========================================================================
    // Live operations
    // =========================================================================

    /// Flag immediately, outside any unit of work.
    pub async fn flag_now(&self, id: IntentId) -> Result<u64> {
        Ok(self.store.eval(self.flag_script(id)).await?)
    }

    /// Fetch an intent with its live join count.
    pub async fn get(&self, id: IntentId) -> Result<Intent> {
        self.find(id)
            .await?
            .ok_or_else(|| NowhereError::NotFound(format!("Intent {}", id)))
    }

    pub async fn find(&self, id: IntentId) -> Result<Option<Intent>> {
        let Some(raw) = self.store.get(&keys::intent(id)).await? else {
            return Ok(None);
        };
        let intent = Intent::from_blob(&raw)?;
        let joins = self.store.scard(&keys::joins(id)).await?;
        Ok(Some(intent.with_join_count(joins as u64)))
    }

    /// Remaining lifetime of the intent blob.
    pub async fn ttl(&self, id: IntentId) -> Result<KeyTtl> {
        Ok(self.store.ttl(&keys::intent(id)).await?)
    }

    pub async fn exists(&self, id: IntentId) -> Result<bool> {
        Ok(self.ttl(id).await?.exists())
    }

    /// Ranked intents around `center`.
    pub async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedIntent>> {
        let fetch = self.ranking.candidate_count(limit);
        let hits = self
            .store
            .geo_search(keys::GEO_INDEX, center, radius_km, Some(fetch))
            .await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let blob_keys = hits
            .iter()
            .filter_map(|hit| hit.member.parse().ok().map(keys::intent))
            .collect::<Vec<_>>();
        let blobs = self.store.mget(blob_keys).await?;

        let mut zombies = Vec::new();
        let mut candidates = Vec::new();
        let mut blobs = blobs.into_iter();
        for hit in hits {
            if hit.member.parse::<IntentId>().is_err() {
                warn!(member = %hit.member, "Malformed geo member");
                zombies.push(hit.member);
                continue;
            }
            match blobs.next().flatten() {
                None => zombies.push(hit.member),
                Some(raw) => match Intent::from_blob(&raw) {
                    Ok(intent) if discovery::is_discoverable(&intent, &self.ranking) => {
                        candidates.push((intent, hit.distance_km))
                    }
                    Ok(_) => {}
                    Err(e) => warn!(intent_id = %hit.member, error = %e, "Undecodable intent blob"),
                },
            }
        }

        self.remove_zombies(zombies).await;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let join_keys = candidates
            .iter()
            .map(|(intent, _)| keys::joins(intent.id()))
            .collect();
        let counts = self.store.scard_many(join_keys).await?;
        let candidates = candidates
            .into_iter()
            .zip(counts)
            .map(|((intent, distance_km), joins)| (intent.with_join_count(joins as u64), distance_km))
            .collect();

        Ok(discovery::rank(candidates, radius_km, now, limit, &self.ranking))
    }

    /// Geo entries whose blob has expired; removal is best-effort.
    async fn remove_zombies(&self, zombies: Vec<String>) {
        if zombies.is_empty() {
            return;
        }
        let count = zombies.len();
        match self.store.geo_remove(keys::GEO_INDEX, zombies).await {
            Ok(removed) => debug!(found = count, removed = removed, "Removed zombie geo entries"),
            Err(e) => warn!(found = count, error = %e, "Failed to remove zombie geo entries"),
        }
    }

    /// Density clusters around `center`.
    pub async fn clusters(&self, center: GeoPoint, radius_km: f64) -> Result<Vec<Cluster>> {
        let hits = self
            .store
            .geo_search(
                keys::GEO_INDEX,
                center,
                radius_km,
                Some(self.ranking.cluster_sample_limit),
            )
            .await?;
        let points: Vec<GeoPoint> = hits.into_iter().map(|hit| hit.point).collect();
        Ok(discovery::cluster_points(
            &points,
            discovery::grid_precision(radius_km),
        ))
    }

    /// Raw geo index hits around `center`, capped at [`COUNT_NEARBY_CAP`].
    pub async fn count_nearby(&self, center: GeoPoint, radius_km: f64) -> Result<usize> {
        let hits = self
            .store
            .geo_search(keys::GEO_INDEX, center, radius_km, Some(COUNT_NEARBY_CAP))
            .await?;
        Ok(hits.len())
    }

    /// Live intents created by `owner`, newest first.
    ///
    /// Ids whose blob has expired are pruned from the owner index.
    pub async fn by_owner(&self, owner: &ActorId) -> Result<Vec<Intent>> {
        let owner_key = keys::owner_intents(owner);
        let ids: Vec<IntentId> = self
            .store
            .smembers(&owner_key)
            .await?
            .iter()
            .filter_map(|member| member.parse().ok())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let blobs = self
            .store
            .mget(ids.iter().copied().map(keys::intent).collect())
            .await?;

        let mut dead = Vec::new();
        let mut live = Vec::new();
        for (id, blob) in ids.into_iter().zip(blobs) {
            match blob {
                Some(raw) => match Intent::from_blob(&raw) {
                    Ok(intent) => live.push(intent),
                    Err(e) => warn!(intent_id = %id, error = %e, "Undecodable intent blob"),
                },
                None => dead.push(id.to_string()),
            }
        }

        if !dead.is_empty() {
            if let Err(e) = self.store.srem(&owner_key, dead).await {
                warn!(owner = %owner, error = %e, "Failed to prune owner index");
            }
        }

        let counts = self
            .store
            .scard_many(live.iter().map(|intent| keys::joins(intent.id())).collect())
            .await?;
        let mut intents: Vec<Intent> = live
            .into_iter()
            .zip(counts)
            .map(|(intent, joins)| intent.with_join_count(joins as u64))
            .collect();
        intents.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(intents)
    }
}

// =============================================================================
// Scoped writer
// =============================================================================

impl Scoped<'_, IntentRepository> {
    pub fn save(&mut self, intent: &Intent, now: DateTime<Utc>) -> Result<Deferred<()>> {
        self.repo.stage_save(self.batch, intent, now)
    }

    pub fn flag(&mut self, id: IntentId) -> Deferred<u64> {
        self.repo.stage_flag(self.batch, id)
    }
}
