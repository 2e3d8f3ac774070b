//! Haversine distance provider (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate travel distance and time.
//! Less accurate than OSRM (ignores roads) but always available.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::{Cost, Point};
use crate::polyline::Polyline;
use crate::traits::NetworkDistanceProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine-based cost provider.
///
/// Estimates road distance as straight-line distance times a detour factor,
/// and travel time from that distance at an assumed speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Multiplier from straight-line to road distance.
    pub detour_factor: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            detour_factor: 1.0,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64, detour_factor: f64) -> Self {
        Self {
            speed_kmh,
            detour_factor,
        }
    }

    /// Estimated cost of driving from `from` to `to`.
    pub fn cost(&self, from: Point, to: Point) -> Cost {
        let meters = haversine_meters(from, to) * self.detour_factor;
        Cost::new(meters, self.meters_to_seconds(meters))
    }

    /// Full matrix; infallible, unlike the trait method.
    pub fn costs_for(&self, points: &[Point]) -> Vec<Vec<Cost>> {
        points
            .iter()
            .enumerate()
            .map(|(i, from)| {
                points
                    .iter()
                    .enumerate()
                    .map(|(j, to)| if i == j { Cost::ZERO } else { self.cost(*from, *to) })
                    .collect()
            })
            .collect()
    }

    /// Straight-line legs between consecutive points.
    pub fn straight_legs(ordered: &[Point]) -> Vec<Polyline> {
        ordered
            .windows(2)
            .map(|pair| Polyline::straight(pair[0], pair[1]))
            .collect()
    }

    fn meters_to_seconds(&self, meters: f64) -> f64 {
        let meters_per_second = self.speed_kmh * 1000.0 / 3600.0;
        (meters / meters_per_second).round()
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_meters(from: Point, to: Point) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

impl NetworkDistanceProvider for HaversineMatrix {
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError> {
        Ok(self.costs_for(points))
    }

    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError> {
        Ok(Self::straight_legs(ordered))
    }

    fn name(&self) -> &str {
        "haversine"
    }
}
