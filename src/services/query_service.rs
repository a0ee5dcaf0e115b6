//! Query service - read use cases
//!
//! Reads bypass the unit of work and go straight to committed state.

use std::sync::Arc;

use tracing::debug;

use crate::discovery::{Cluster, RankedIntent};
use crate::domain::intent::validate_coordinates;
use crate::domain::{ActorId, Clock, Intent, IntentId, Message};
use crate::repo::Repositories;
use crate::store::GeoPoint;
use crate::types::{NowhereError, Result};

/// Defaults applied when a query leaves a parameter out.
#[derive(Debug, Clone)]
pub struct QueryDefaults {
    pub nearby_radius_km: f64,
    pub nearby_limit: usize,
    pub cluster_radius_km: f64,
    pub message_limit: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            nearby_radius_km: 1.0,
            nearby_limit: 50,
            cluster_radius_km: 10.0,
            message_limit: 50,
        }
    }
}

pub struct IntentQueryService {
    repos: Arc<Repositories>,
    clock: Arc<dyn Clock>,
    defaults: QueryDefaults,
}

fn search_area(latitude: f64, longitude: f64, radius_km: f64) -> Result<GeoPoint> {
    validate_coordinates(latitude, longitude)?;
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(NowhereError::Validation(format!(
            "Radius must be a positive number of kilometers, got {}",
            radius_km
        )));
    }
    Ok(GeoPoint::new(latitude, longitude))
}

impl IntentQueryService {
    pub fn new(repos: Arc<Repositories>, clock: Arc<dyn Clock>, defaults: QueryDefaults) -> Self {
        Self {
            repos,
            clock,
            defaults,
        }
    }

    /// One intent with its live join count, discoverable or not.
    pub async fn get(&self, id: IntentId) -> Result<Intent> {
        self.repos.intents.get(id).await
    }

    /// Ranked intents around a point.
    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<RankedIntent>> {
        let radius_km = radius_km.unwrap_or(self.defaults.nearby_radius_km);
        let limit = limit.unwrap_or(self.defaults.nearby_limit);
        let center = search_area(latitude, longitude, radius_km)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let ranked = self
            .repos
            .intents
            .find_nearby(center, radius_km, limit, self.clock.now())
            .await?;
        debug!(
            latitude = latitude,
            longitude = longitude,
            radius_km = radius_km,
            results = ranked.len(),
            "Nearby query"
        );
        Ok(ranked)
    }

    /// Density clusters around a point.
    pub async fn clusters(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<Cluster>> {
        let radius_km = radius_km.unwrap_or(self.defaults.cluster_radius_km);
        let center = search_area(latitude, longitude, radius_km)?;
        self.repos.intents.clusters(center, radius_km).await
    }

    /// Raw number of indexed intents around a point (capped).
    pub async fn count_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
    ) -> Result<usize> {
        let radius_km = radius_km.unwrap_or(self.defaults.nearby_radius_km);
        let center = search_area(latitude, longitude, radius_km)?;
        self.repos.intents.count_nearby(center, radius_km).await
    }

    /// Most recent messages of an intent, oldest first.
    pub async fn messages(&self, intent_id: IntentId, limit: Option<usize>) -> Result<Vec<Message>> {
        let limit = limit.unwrap_or(self.defaults.message_limit);
        self.repos.messages.recent(intent_id, limit).await
    }

    pub async fn intents_by_owner(&self, owner: &ActorId) -> Result<Vec<Intent>> {
        self.repos.intents.by_owner(owner).await
    }
}

impl std::fmt::Debug for IntentQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentQueryService")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
