//! Discovery
//!
//! Pure functions behind the proximity and overview queries:
//!
//! - [`ranking`] - relevance score, visibility gate, final ordering
//! - [`clustering`] - grid bucketing into density clusters
//!
//! Neither module touches the store; repositories feed them candidates.

pub mod clustering;
pub mod ranking;

pub use clustering::{cluster_points, grid_precision, Cluster};
pub use ranking::{is_discoverable, is_visible, rank, score, RankedIntent};

/// Discovery tuning
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Flags at which an intent leaves discovery
    pub flag_threshold: u64,
    /// Radius within which unverified intents are visible (km)
    pub unverified_radius_km: f64,
    /// Candidate multiplier applied to the requested limit
    pub oversample: usize,
    /// Lower bound on candidates fetched per nearby query
    pub min_candidates: usize,
    /// Maximum points bucketed per cluster query
    pub cluster_sample_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            flag_threshold: 3,
            unverified_radius_km: 0.2,
            oversample: 2,
            min_candidates: 100,
            cluster_sample_limit: 1000,
        }
    }
}

impl RankingConfig {
    /// Candidates to fetch for a nearby query returning `limit` results.
    pub fn candidate_count(&self, limit: usize) -> usize {
        limit.saturating_mul(self.oversample).max(self.min_candidates)
    }
}
