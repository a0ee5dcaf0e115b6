//! Relevance ranking
//!
//! ```text
//! dist_score  = max(0, 1 - distance/radius)
//! fresh_score = max(0, 1 - age_seconds/86400)
//! pop_score   = ln(1 + join_count)
//! score       = 1.0*dist_score + 2.0*fresh_score + 0.5*pop_score
//! ```
//!
//! Visibility is a gate, not a penalty: hidden intents are dropped before
//! scoring.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RankingConfig;
use crate::domain::Intent;

pub const DISTANCE_WEIGHT: f64 = 1.0;
pub const FRESHNESS_WEIGHT: f64 = 2.0;
pub const POPULARITY_WEIGHT: f64 = 0.5;

/// Freshness decays to zero over this window.
pub const FRESHNESS_WINDOW_SECS: f64 = 86_400.0;

/// Relevance of `intent` seen from `distance_km` away.
///
/// Ages before creation (clock skew) count as zero.
pub fn score(intent: &Intent, distance_km: f64, radius_km: f64, now: DateTime<Utc>) -> f64 {
    let dist_score = (1.0 - distance_km / radius_km).max(0.0);
    let age = intent.age_seconds(now).max(0.0);
    let fresh_score = (1.0 - age / FRESHNESS_WINDOW_SECS).max(0.0);
    let pop_score = (intent.join_count() as f64).ln_1p();

    DISTANCE_WEIGHT * dist_score + FRESHNESS_WEIGHT * fresh_score + POPULARITY_WEIGHT * pop_score
}

/// Below the flag threshold.
pub fn is_discoverable(intent: &Intent, config: &RankingConfig) -> bool {
    intent.flag_count() < config.flag_threshold
}

/// Unverified intents (no joins, not system) only show up close by.
pub fn is_visible(intent: &Intent, distance_km: f64, config: &RankingConfig) -> bool {
    !(intent.join_count() == 0 && !intent.is_system() && distance_km > config.unverified_radius_km)
}

/// An intent in a nearby result.
#[derive(Debug, Clone, Serialize)]
pub struct RankedIntent {
    pub intent: Intent,
    pub distance_km: f64,
    pub score: f64,
}

/// Gate, score, order and truncate candidates.
///
/// Candidates carry live join counts. Ordering is score descending, ties
/// broken by id ascending.
pub fn rank(
    candidates: Vec<(Intent, f64)>,
    radius_km: f64,
    now: DateTime<Utc>,
    limit: usize,
    config: &RankingConfig,
) -> Vec<RankedIntent> {
    let mut ranked: Vec<RankedIntent> = candidates
        .into_iter()
        .filter(|(intent, distance_km)| {
            is_discoverable(intent, config) && is_visible(intent, *distance_km, config)
        })
        .map(|(intent, distance_km)| RankedIntent {
            score: score(&intent, distance_km, radius_km, now),
            intent,
            distance_km,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.intent.id().cmp(&b.intent.id()))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActorId, NewIntent};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn intent(is_system: bool, created_at: DateTime<Utc>) -> Intent {
        Intent::create(
            NewIntent {
                owner: (!is_system).then(|| ActorId::new("alice")),
                title: "Coffee run".into(),
                emoji: "☕".into(),
                latitude: 40.7128,
                longitude: -74.0060,
                is_system,
            },
            created_at,
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_close_unjoined_scores_three() {
        let i = intent(false, now());
        assert!((score(&i, 0.0, 1.0, now()) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_joins_popularity() {
        let i = intent(false, now()).with_join_count(2);
        let expected = 3.0 + 0.5 * 3f64.ln();
        assert!((score(&i, 0.0, 1.0, now()) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_floors_at_zero() {
        let i = intent(false, now() - Duration::hours(30));
        assert!((score(&i, 0.0, 1.0, now()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_future_creation_counts_as_fresh() {
        let i = intent(false, now() + Duration::minutes(5));
        assert!((score(&i, 0.0, 1.0, now()) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_visibility_gate_boundary() {
        let config = RankingConfig::default();
        let i = intent(false, now());
        assert!(is_visible(&i, 0.19, &config));
        assert!(is_visible(&i, 0.2, &config));
        assert!(!is_visible(&i, 0.21, &config));

        assert!(is_visible(&i.with_join_count(1), 0.9, &config));
        assert!(is_visible(&intent(true, now()), 0.9, &config));
    }

    #[test]
    fn test_flag_threshold() {
        let config = RankingConfig::default();
        let i = intent(false, now());
        assert!(is_discoverable(&i.flag().flag(), &config));
        assert!(!is_discoverable(&i.flag().flag().flag(), &config));
    }

    #[test]
    fn test_rank_orders_gates_and_truncates() {
        let config = RankingConfig::default();
        let close = intent(false, now());
        let popular = intent(false, now()).with_join_count(5);
        let hidden = intent(false, now());
        let flagged = intent(true, now()).flag().flag().flag();

        let ranked = rank(
            vec![
                (close.clone(), 0.1),
                (popular.clone(), 0.5),
                (hidden, 0.5),
                (flagged, 0.0),
            ],
            1.0,
            now(),
            10,
            &config,
        );
        let ids: Vec<_> = ranked.iter().map(|r| r.intent.id()).collect();
        assert_eq!(ids, vec![popular.id(), close.id()]);

        let top = rank(vec![(close.clone(), 0.1), (popular.clone(), 0.5)], 1.0, now(), 1, &config);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_rank_ties_break_by_id() {
        let config = RankingConfig::default();
        let a = intent(true, now());
        let b = intent(true, now());
        let ranked = rank(vec![(a.clone(), 0.3), (b.clone(), 0.3)], 1.0, now(), 10, &config);
        let mut expected = vec![a.id(), b.id()];
        expected.sort();
        let ids: Vec<_> = ranked.iter().map(|r| r.intent.id()).collect();
        assert_eq!(ids, expected);
    }

    proptest! {
        #[test]
        fn prop_score_decreases_with_distance(d1 in 0.0f64..1.0, d2 in 0.0f64..1.0) {
            prop_assume!((d1 - d2).abs() > 1e-9);
            let i = intent(false, now());
            let (near, far) = if d1 < d2 { (d1, d2) } else { (d2, d1) };
            prop_assert!(score(&i, near, 1.0, now()) > score(&i, far, 1.0, now()));
        }

        #[test]
        fn prop_score_decreases_with_age(a1 in 0i64..86_399, a2 in 0i64..86_399) {
            prop_assume!(a1 != a2);
            let (young, old) = if a1 < a2 { (a1, a2) } else { (a2, a1) };
            let young = intent(false, now() - Duration::seconds(young));
            let old = intent(false, now() - Duration::seconds(old));
            prop_assert!(score(&young, 0.1, 1.0, now()) > score(&old, 0.1, 1.0, now()));
        }

        #[test]
        fn prop_score_increases_with_joins(j1 in 0u64..10_000, j2 in 0u64..10_000) {
            prop_assume!(j1 != j2);
            let (few, many) = if j1 < j2 { (j1, j2) } else { (j2, j1) };
            let i = intent(false, now());
            prop_assert!(
                score(&i.with_join_count(many), 0.1, 1.0, now())
                    > score(&i.with_join_count(few), 0.1, 1.0, now())
            );
        }
    }
}
