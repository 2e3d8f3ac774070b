//! Request and result types shared by the engine stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::polyline::Polyline;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    /// Builds a point, rejecting NaN/infinite or out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, EngineError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(EngineError::InvalidPoint { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Coordinates rounded to roughly one metre, for keying caches.
    pub fn rounded_key(&self) -> (i64, i64) {
        ((self.lat * 1e5).round() as i64, (self.lng * 1e5).round() as i64)
    }
}

impl TryFrom<(f64, f64)> for Point {
    type Error = EngineError;

    fn try_from((lat, lng): (f64, f64)) -> Result<Self, Self::Error> {
        Point::new(lat, lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopKind {
    Pickup,
    Delivery,
    /// Synthetic final stop back at the depot; never persisted upstream.
    DepotReturn,
}

/// A resolved, routable stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop<I> {
    pub id: I,
    pub point: Point,
    pub kind: StopKind,
    pub weight: Option<f64>,
}

/// Travel cost between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        distance_meters: 0.0,
        duration_seconds: 0.0,
    };

    pub fn new(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            distance_meters,
            duration_seconds,
        }
    }

    /// Usable as a travel cost: finite and non-negative on both axes.
    pub fn is_sane(&self) -> bool {
        self.distance_meters.is_finite()
            && self.duration_seconds.is_finite()
            && self.distance_meters >= 0.0
            && self.duration_seconds >= 0.0
    }
}

/// Soft preference for which side of the divide to serve first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrossingPreference {
    #[default]
    Any,
    PreferSideA,
    PreferSideB,
}

/// Input to the sequencer. `start` and `end` are already resolved.
#[derive(Debug, Clone)]
pub struct RoutingRequest<I> {
    pub start: Point,
    pub stops: Vec<Stop<I>>,
    pub end: Point,
    pub crossing_preference: CrossingPreference,
    pub keep_order: bool,
}

impl<I> RoutingRequest<I> {
    /// Matrix order used throughout: start, stops in input order, end.
    pub fn matrix_points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.stops.len() + 2);
        points.push(self.start);
        points.extend(self.stops.iter().map(|stop| stop.point));
        points.push(self.end);
        points
    }
}

/// One driven leg between consecutive stops.
///
/// `None` on `from_stop_id` is the start depot; on `to_stop_id` it is the
/// depot-return stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg<I> {
    pub from_stop_id: Option<I>,
    pub to_stop_id: Option<I>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub geometry: Polyline,
}

/// A stop in its final visiting position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedStop<I> {
    pub shipment_id: Option<I>,
    pub point: Point,
    pub kind: StopKind,
    pub weight: Option<f64>,
    pub route_order: usize,
    pub is_depot_return: bool,
    pub cumulative_distance_meters: f64,
    pub cumulative_duration_seconds: f64,
    pub eta: Option<DateTime<Utc>>,
}

/// Bookkeeping from the ordering search.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Path cost right after construction (or of the kept order).
    pub constructed_cost: f64,
    /// Path cost of the emitted order.
    pub final_cost: f64,
    pub two_opt_passes: usize,
    pub improving_moves: usize,
    pub crossing_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult<I> {
    pub ordered_stops: Vec<RoutedStop<I>>,
    pub legs: Vec<Leg<I>>,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
    pub degraded: bool,
    pub search: SearchStats,
}

impl<I> RouteResult<I> {
    /// Stops to persist: everything except the synthetic depot return.
    pub fn shipment_stops(&self) -> impl Iterator<Item = &RoutedStop<I>> {
        self.ordered_stops.iter().filter(|stop| !stop.is_depot_return)
    }
}
