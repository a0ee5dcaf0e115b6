//! Configuration for Nowhere
//!
//! CLI arguments and environment variable handling using clap. A `.env`
//! file is loaded first by the binary, so every setting can come from the
//! environment.

use std::time::Duration;

use clap::Parser;

use crate::discovery::RankingConfig;
use crate::repo::StoreConfig;
use crate::services::QueryDefaults;

/// Nowhere - ephemeral geospatial intent store
#[derive(Parser, Debug, Clone)]
#[command(name = "nowhere")]
#[command(about = "Ephemeral geospatial intent store")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Lifetime of an intent and its joins/messages, in seconds
    #[arg(long, env = "INTENT_TTL_SECS", default_value = "86400")]
    pub intent_ttl_secs: u64,

    /// Messages kept per intent
    #[arg(long, env = "MESSAGE_HISTORY", default_value = "100")]
    pub message_history: usize,

    /// Flags at which an intent leaves discovery
    #[arg(long, env = "FLAG_THRESHOLD", default_value = "3")]
    pub flag_threshold: u64,

    /// Radius within which unverified intents are visible (km)
    #[arg(long, env = "UNVERIFIED_RADIUS_KM", default_value = "0.2")]
    pub unverified_radius_km: f64,

    /// Candidate multiplier for nearby queries
    #[arg(long, env = "NEARBY_OVERSAMPLE", default_value = "2")]
    pub nearby_oversample: usize,

    /// Minimum candidates fetched per nearby query
    #[arg(long, env = "NEARBY_MIN_CANDIDATES", default_value = "100")]
    pub nearby_min_candidates: usize,

    /// Maximum points bucketed per cluster query
    #[arg(long, env = "CLUSTER_SAMPLE_LIMIT", default_value = "1000")]
    pub cluster_sample_limit: usize,

    /// Default nearby radius (km)
    #[arg(long, env = "NEARBY_RADIUS_KM", default_value = "1.0")]
    pub nearby_radius_km: f64,

    /// Default nearby result limit
    #[arg(long, env = "NEARBY_LIMIT", default_value = "50")]
    pub nearby_limit: usize,

    /// Default cluster radius (km)
    #[arg(long, env = "CLUSTER_RADIUS_KM", default_value = "10.0")]
    pub cluster_radius_km: f64,

    /// Seconds between sweeps of expired keys
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "60")]
    pub sweep_interval_secs: u64,

    /// Seconds between expiry queue reaps
    #[arg(long, env = "REAP_INTERVAL_SECS", default_value = "60")]
    pub reap_interval_secs: u64,

    /// Seconds between stats log lines
    #[arg(long, env = "STATS_INTERVAL_SECS", default_value = "300")]
    pub stats_interval_secs: u64,

    /// Ambient seeding
    #[command(flatten)]
    pub seed: SeedArgs,
}

/// Ambient seeding configuration
#[derive(Parser, Debug, Clone)]
pub struct SeedArgs {
    /// Latitude to seed around (seeding is off unless both coordinates are set)
    #[arg(long, env = "SEED_LATITUDE", allow_negative_numbers = true)]
    pub seed_latitude: Option<f64>,

    /// Longitude to seed around
    #[arg(long, env = "SEED_LONGITUDE", allow_negative_numbers = true)]
    pub seed_longitude: Option<f64>,

    /// Number of intents to seed
    #[arg(long, env = "SEED_COUNT", default_value = "3")]
    pub seed_count: usize,

    /// Seeding radius (km)
    #[arg(long, env = "SEED_RADIUS_KM", default_value = "0.5")]
    pub seed_radius_km: f64,
}

impl SeedArgs {
    /// Seeding location, when configured
    pub fn location(&self) -> Option<(f64, f64)> {
        self.seed_latitude.zip(self.seed_longitude)
    }
}

fn positive_km(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a positive number of kilometers", name))
    }
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.intent_ttl_secs == 0 {
            return Err("INTENT_TTL_SECS must be greater than zero".to_string());
        }
        if self.message_history == 0 {
            return Err("MESSAGE_HISTORY must be greater than zero".to_string());
        }
        if self.flag_threshold == 0 {
            return Err("FLAG_THRESHOLD must be greater than zero".to_string());
        }
        if self.nearby_oversample == 0 {
            return Err("NEARBY_OVERSAMPLE must be greater than zero".to_string());
        }
        if self.sweep_interval_secs == 0 || self.reap_interval_secs == 0 || self.stats_interval_secs == 0 {
            return Err("Background task intervals must be greater than zero".to_string());
        }
        positive_km("UNVERIFIED_RADIUS_KM", self.unverified_radius_km)?;
        positive_km("NEARBY_RADIUS_KM", self.nearby_radius_km)?;
        positive_km("CLUSTER_RADIUS_KM", self.cluster_radius_km)?;

        match (self.seed.seed_latitude, self.seed.seed_longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err("Seed location is outside valid coordinates".to_string());
                }
                positive_km("SEED_RADIUS_KM", self.seed.seed_radius_km)?;
            }
            (None, None) => {}
            _ => {
                return Err("SEED_LATITUDE and SEED_LONGITUDE must be set together".to_string());
            }
        }

        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            intent_ttl: Duration::from_secs(self.intent_ttl_secs),
            message_history: self.message_history,
        }
    }

    pub fn ranking_config(&self) -> RankingConfig {
        RankingConfig {
            flag_threshold: self.flag_threshold,
            unverified_radius_km: self.unverified_radius_km,
            oversample: self.nearby_oversample,
            min_candidates: self.nearby_min_candidates,
            cluster_sample_limit: self.cluster_sample_limit,
        }
    }

    pub fn query_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            nearby_radius_km: self.nearby_radius_km,
            nearby_limit: self.nearby_limit,
            cluster_radius_km: self.cluster_radius_km,
            ..Default::default()
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(flags: &[&str]) -> Args {
        let mut argv = vec!["nowhere"];
        argv.extend_from_slice(flags);
        Args::try_parse_from(argv).unwrap()
    }

    fn rejected(flags: &[&str]) -> String {
        parse(flags).validate().unwrap_err()
    }

    #[test]
    fn test_defaults_validate() {
        let args = parse(&[]);
        assert!(args.validate().is_ok());
        assert!(args.seed.location().is_none());

        let store = args.store_config();
        assert_eq!(store.intent_ttl, Duration::from_secs(86_400));
        assert_eq!(store.message_history, 100);
        assert_eq!(args.ranking_config().flag_threshold, 3);
        assert_eq!(args.query_defaults().nearby_limit, 50);
        assert_eq!(args.reap_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_zero_counts() {
        assert!(rejected(&["--intent-ttl-secs", "0"]).contains("INTENT_TTL_SECS"));
        assert!(rejected(&["--message-history", "0"]).contains("MESSAGE_HISTORY"));
        assert!(rejected(&["--flag-threshold", "0"]).contains("FLAG_THRESHOLD"));
        assert!(rejected(&["--nearby-oversample", "0"]).contains("NEARBY_OVERSAMPLE"));
    }

    #[test]
    fn test_rejects_zero_intervals() {
        for flag in ["--sweep-interval-secs", "--reap-interval-secs", "--stats-interval-secs"] {
            assert!(rejected(&[flag, "0"]).contains("intervals"));
        }
    }

    #[test]
    fn test_rejects_unusable_radii() {
        for value in ["0", "-1", "inf", "NaN"] {
            let arg = format!("--unverified-radius-km={}", value);
            assert!(rejected(&[arg.as_str()]).contains("UNVERIFIED_RADIUS_KM"));
            let arg = format!("--nearby-radius-km={}", value);
            assert!(rejected(&[arg.as_str()]).contains("NEARBY_RADIUS_KM"));
            let arg = format!("--cluster-radius-km={}", value);
            assert!(rejected(&[arg.as_str()]).contains("CLUSTER_RADIUS_KM"));
        }
    }

    #[test]
    fn test_seed_location() {
        let args = parse(&["--seed-latitude", "-33.86", "--seed-longitude", "151.21"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.seed.location(), Some((-33.86, 151.21)));

        let err = rejected(&["--seed-latitude=-91", "--seed-longitude=0"]);
        assert!(err.contains("outside valid coordinates"));
        let err = rejected(&["--seed-latitude=0", "--seed-longitude=181"]);
        assert!(err.contains("outside valid coordinates"));

        let err = rejected(&["--seed-latitude=1", "--seed-longitude=1", "--seed-radius-km=0"]);
        assert!(err.contains("SEED_RADIUS_KM"));

        assert!(rejected(&["--seed-latitude=1"]).contains("set together"));
        assert!(rejected(&["--seed-longitude=1"]).contains("set together"));
    }

    #[test]
    fn test_seed_radius_ignored_without_location() {
        assert!(parse(&["--seed-radius-km=0"]).validate().is_ok());
    }
}
