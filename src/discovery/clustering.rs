//! Density clustering for overview queries
//!
//! Points are bucketed on a lat/lon grid; each bucket reports its size and
//! the mean of its raw coordinates. No ranking or freshness weighting.

use std::collections::HashMap;

use serde::Serialize;

use crate::store::GeoPoint;

/// Radius above which the coarser grid is used (km).
pub const COARSE_GRID_RADIUS_KM: f64 = 5.0;

/// Grid precision in decimal places for a query radius.
pub fn grid_precision(radius_km: f64) -> usize {
    if radius_km > COARSE_GRID_RADIUS_KM {
        2
    } else {
        3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    /// Grid cell, `"lat,lon"` at the grid precision
    pub key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
}

fn snap(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    // + 0.0 folds -0.0 into 0.0 so both land in one cell
    (value * scale).round() / scale + 0.0
}

/// Bucket points into grid clusters, largest first (ties by key).
pub fn cluster_points(points: &[GeoPoint], precision: usize) -> Vec<Cluster> {
    let mut cells: HashMap<String, (f64, f64, usize)> = HashMap::new();
    for point in points {
        let key = format!(
            "{:.*},{:.*}",
            precision,
            snap(point.latitude, precision),
            precision,
            snap(point.longitude, precision)
        );
        let cell = cells.entry(key).or_insert((0.0, 0.0, 0));
        cell.0 += point.latitude;
        cell.1 += point.longitude;
        cell.2 += 1;
    }

    let mut clusters: Vec<Cluster> = cells
        .into_iter()
        .map(|(key, (lat_sum, lon_sum, count))| Cluster {
            key,
            latitude: lat_sum / count as f64,
            longitude: lon_sum / count as f64,
            count,
        })
        .collect();
    clusters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    clusters
}
