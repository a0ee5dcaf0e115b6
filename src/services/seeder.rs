//! Ambient seeding
//!
//! Scatters a few system intents around a point so a fresh area is not empty.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use super::intent_service::IntentService;
use crate::domain::Intent;
use crate::domain::intent::validate_coordinates;
use crate::types::{NowhereError, Result};

/// Kilometers per degree of latitude, used for the offset box.
const KM_PER_DEGREE: f64 = 111.0;

/// (emoji, title) pairs used for seeded intents.
pub const AMBIENT_VIBES: [(&str, &str); 6] = [
    ("☕️", "Anyone for coffee?"),
    ("🚶", "Evening walk?"),
    ("🏀", "Hoops?"),
    ("📚", "Study session"),
    ("🍕", "Pizza slice"),
    ("🎸", "Jamming"),
];

pub struct AmbientSeeder {
    intents: Arc<IntentService>,
}

impl AmbientSeeder {
    pub fn new(intents: Arc<IntentService>) -> Self {
        Self { intents }
    }

    /// Seed `count` system intents within roughly `radius_km` of a point.
    pub async fn seed(
        &self,
        latitude: f64,
        longitude: f64,
        count: usize,
        radius_km: f64,
    ) -> Result<Vec<Intent>> {
        validate_coordinates(latitude, longitude)?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(NowhereError::Validation(format!(
                "Seed radius must be a positive number of kilometers, got {}",
                radius_km
            )));
        }
        info!(count = count, latitude = latitude, longitude = longitude, "Seeding ambient intents");

        let offset = radius_km / KM_PER_DEGREE;
        let mut seeded = Vec::with_capacity(count);
        for _ in 0..count {
            let (lat, lon, (emoji, title)) = {
                let mut rng = rand::thread_rng();
                let lat = latitude + rng.gen_range(-offset..=offset);
                let lon = longitude + rng.gen_range(-offset..=offset);
                let vibe = *AMBIENT_VIBES.choose(&mut rng).unwrap_or(&AMBIENT_VIBES[0]);
                (lat.clamp(-90.0, 90.0), lon.clamp(-180.0, 180.0), vibe)
            };
            seeded.push(self.intents.create_system_intent(title, emoji, lat, lon).await?);
        }

        info!(count = seeded.len(), "Seeded ambient intents");
        Ok(seeded)
    }
}
