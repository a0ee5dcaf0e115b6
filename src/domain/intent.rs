//! Intent value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActorId, IntentId};
use crate::store::GeoPoint;
use crate::types::{NowhereError, Result};

/// Maximum title length in characters, after trimming.
pub const TITLE_MAX_CHARS: usize = 50;

/// Maximum emoji length in characters.
pub const EMOJI_MAX_CHARS: usize = 4;

/// Decimal places kept on stored coordinates (~100 m).
pub const COORDINATE_DECIMALS: i32 = 3;

/// Round a coordinate to the stored precision.
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

/// Input for [`Intent::create`].
#[derive(Debug, Clone)]
pub struct NewIntent {
    pub owner: Option<ActorId>,
    pub title: String,
    pub emoji: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_system: bool,
}

/// A short-lived, location-tagged invitation.
///
/// Values are immutable; [`Intent::flag`] and [`Intent::with_join_count`]
/// return new values. The serialized form is the stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    id: IntentId,
    #[serde(rename = "user_id")]
    owner: Option<ActorId>,
    title: String,
    emoji: String,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
    is_system: bool,
    join_count: u64,
    #[serde(rename = "flags")]
    flag_count: u64,
}

impl Intent {
    /// Validate input and build a new intent with a fresh id.
    ///
    /// The title is stored trimmed and coordinates are rounded to
    /// [`COORDINATE_DECIMALS`] places.
    pub fn create(new: NewIntent, created_at: DateTime<Utc>) -> Result<Self> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(NowhereError::Validation("Title cannot be empty".into()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(NowhereError::Validation(format!(
                "Title longer than {} characters",
                TITLE_MAX_CHARS
            )));
        }

        let emoji_len = new.emoji.chars().count();
        if emoji_len == 0 || emoji_len > EMOJI_MAX_CHARS {
            return Err(NowhereError::Validation(
                "Emoji must be a single emoji character".into(),
            ));
        }

        validate_coordinates(new.latitude, new.longitude)?;

        Ok(Self {
            id: IntentId::new(),
            owner: new.owner,
            title: title.to_string(),
            emoji: new.emoji,
            latitude: round_coordinate(new.latitude),
            longitude: round_coordinate(new.longitude),
            created_at,
            is_system: new.is_system,
            join_count: 0,
            flag_count: 0,
        })
    }

    pub fn id(&self) -> IntentId {
        self.id
    }

    pub fn owner(&self) -> Option<&ActorId> {
        self.owner.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn join_count(&self) -> u64 {
        self.join_count
    }

    pub fn flag_count(&self) -> u64 {
        self.flag_count
    }

    /// Seconds since creation; negative when `now` precedes creation.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 1000.0
    }

    /// One more flag.
    pub fn flag(&self) -> Self {
        Self {
            flag_count: self.flag_count + 1,
            ..self.clone()
        }
    }

    /// Same intent carrying a live membership count.
    pub fn with_join_count(&self, count: u64) -> Self {
        Self {
            join_count: count,
            ..self.clone()
        }
    }

    /// Encode as the stored blob.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored blob.
    pub fn from_blob(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub(crate) fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(NowhereError::Validation(format!(
            "Latitude {} outside [-90, 90]",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(NowhereError::Validation(format!(
            "Longitude {} outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn draft(title: &str, emoji: &str, latitude: f64, longitude: f64) -> NewIntent {
        NewIntent {
            owner: Some(ActorId::new("alice")),
            title: title.to_string(),
            emoji: emoji.to_string(),
            latitude,
            longitude,
            is_system: false,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_rounds_and_trims() {
        let intent = Intent::create(draft("  Coffee run ", "☕", 40.7128, -74.0060), at()).unwrap();
        assert_eq!(intent.title(), "Coffee run");
        assert_eq!(intent.latitude(), 40.713);
        assert_eq!(intent.longitude(), -74.006);
        assert_eq!(intent.flag_count(), 0);
        assert_eq!(intent.join_count(), 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let cases = [
            draft("   ", "☕", 0.0, 0.0),
            draft(&"x".repeat(51), "☕", 0.0, 0.0),
            draft("ok", "", 0.0, 0.0),
            draft("ok", "12345", 0.0, 0.0),
            draft("ok", "☕", 90.5, 0.0),
            draft("ok", "☕", 0.0, -180.5),
            draft("ok", "☕", f64::NAN, 0.0),
        ];
        for case in cases {
            let err = Intent::create(case, at()).unwrap_err();
            assert!(matches!(err, NowhereError::Validation(_)));
        }
    }

    #[test]
    fn test_title_limit_counts_characters() {
        let title = "é".repeat(50);
        assert!(Intent::create(draft(&title, "☕", 0.0, 0.0), at()).is_ok());
    }

    #[test]
    fn test_transitions_return_new_values() {
        let intent = Intent::create(draft("Walk", "🚶", 1.0, 1.0), at()).unwrap();
        let flagged = intent.flag().flag();
        assert_eq!(intent.flag_count(), 0);
        assert_eq!(flagged.flag_count(), 2);
        assert_eq!(flagged.id(), intent.id());

        let joined = intent.with_join_count(4);
        assert_eq!(joined.join_count(), 4);
        assert_eq!(intent.join_count(), 0);
    }

    #[test]
    fn test_blob_field_names() {
        let intent = Intent::create(draft("Walk", "🚶", 1.0, 1.0), at()).unwrap();
        let blob: serde_json::Value = serde_json::from_str(&intent.to_blob().unwrap()).unwrap();
        for field in [
            "id",
            "user_id",
            "title",
            "emoji",
            "latitude",
            "longitude",
            "created_at",
            "is_system",
            "join_count",
            "flags",
        ] {
            assert!(blob.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(Intent::from_blob(&intent.to_blob().unwrap()).unwrap(), intent);
    }

    proptest! {
        #[test]
        fn prop_coordinates_stored_at_three_decimals(
            latitude in -90.0f64..=90.0,
            longitude in -180.0f64..=180.0,
        ) {
            let intent = Intent::create(draft("p", "📍", latitude, longitude), at()).unwrap();
            prop_assert_eq!(intent.latitude(), round_coordinate(latitude));
            prop_assert_eq!(intent.longitude(), round_coordinate(longitude));
            prop_assert!((intent.latitude() - latitude).abs() <= 0.000_5 + 1e-9);
            prop_assert!((intent.longitude() - longitude).abs() <= 0.000_5 + 1e-9);
            prop_assert!((intent.latitude() * 1000.0 - (intent.latitude() * 1000.0).round()).abs() < 1e-6);
        }
    }
}
