//! Crossing classification against a fixed geographic divide.
//!
//! A divide (a river, a strait, a rail corridor) splits the service area in
//! two. Classifiers are pure functions of the point; the sequencer uses the
//! resulting [`Side`] only to bias visiting order, never to drop stops.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{CrossingPreference, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Side to serve first under `preference`, if any.
    pub fn preferred(preference: CrossingPreference) -> Option<Side> {
        match preference {
            CrossingPreference::Any => None,
            CrossingPreference::PreferSideA => Some(Side::A),
            CrossingPreference::PreferSideB => Some(Side::B),
        }
    }
}

pub trait CrossingClassifier: Send + Sync {
    fn classify(&self, point: Point) -> Side;
}

/// Divide given as an open polyline.
///
/// [`Side::A`] is everything to the left when walking the vertices in order;
/// points exactly on the line count as A.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDivide {
    /// Vertices projected to a local plane, as (x, y).
    vertices: Vec<(f64, f64)>,
    lng_scale: f64,
}

impl LineDivide {
    /// Consecutive repeated vertices are collapsed; at least two distinct
    /// vertices must remain.
    pub fn new(mut points: Vec<Point>) -> Result<Self, EngineError> {
        if let Some(bad) = points.iter().find(|point| !point.is_valid()) {
            return Err(EngineError::InvalidPoint { lat: bad.lat, lng: bad.lng });
        }
        points.dedup();
        if points.len() < 2 {
            return Err(EngineError::InvalidDivide(format!(
                "line divide needs at least 2 distinct points, got {}",
                points.len()
            )));
        }

        let mean_lat = points.iter().map(|point| point.lat).sum::<f64>() / points.len() as f64;
        let lng_scale = mean_lat.to_radians().cos();
        let vertices = points
            .iter()
            .map(|point| (point.lng * lng_scale, point.lat))
            .collect();

        Ok(Self { vertices, lng_scale })
    }

    fn project(&self, point: Point) -> (f64, f64) {
        (point.lng * self.lng_scale, point.lat)
    }

    /// Index of the nearest segment and the clamped projection parameter.
    fn nearest_segment(&self, p: (f64, f64)) -> (usize, f64) {
        let mut best = (0, 0.0);
        let mut best_dist = f64::INFINITY;
        for (index, pair) in self.vertices.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            let len_sq = dx * dx + dy * dy;
            let t = if len_sq > 0.0 {
                (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
            let dist = (p.0 - cx).powi(2) + (p.1 - cy).powi(2);
            if dist < best_dist {
                best_dist = dist;
                best = (index, t);
            }
        }
        best
    }

    fn left_of(&self, segment: usize, p: (f64, f64)) -> bool {
        let (a, b) = (self.vertices[segment], self.vertices[segment + 1]);
        cross((b.0 - a.0, b.1 - a.1), (p.0 - a.0, p.1 - a.1)) >= 0.0
    }
}

impl CrossingClassifier for LineDivide {
    fn classify(&self, point: Point) -> Side {
        let p = self.project(point);
        let (segment, t) = self.nearest_segment(p);
        let last = self.vertices.len() - 2;

        // Nearest to an interior vertex: decide by the turn at that vertex.
        let neighbour = if t <= 0.0 && segment > 0 {
            Some((segment - 1, segment))
        } else if t >= 1.0 && segment < last {
            Some((segment, segment + 1))
        } else {
            None
        };

        let left = match neighbour {
            Some((incoming, outgoing)) => {
                let u = self.vertices[incoming];
                let v = self.vertices[outgoing];
                let w = self.vertices[outgoing + 1];
                let left_turn = cross((v.0 - u.0, v.1 - u.1), (w.0 - v.0, w.1 - v.1)) > 0.0;
                let (l1, l2) = (self.left_of(incoming, p), self.left_of(outgoing, p));
                if left_turn { l1 && l2 } else { l1 || l2 }
            }
            None => self.left_of(segment, p),
        };

        if left { Side::A } else { Side::B }
    }
}

/// Divide given as a closed polygon: inside is [`Side::A`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonDivide {
    ring: Vec<Point>,
}

impl PolygonDivide {
    pub fn new(ring: Vec<Point>) -> Result<Self, EngineError> {
        if ring.len() < 3 {
            return Err(EngineError::InvalidDivide(format!(
                "polygon divide needs at least 3 points, got {}",
                ring.len()
            )));
        }
        if let Some(bad) = ring.iter().find(|point| !point.is_valid()) {
            return Err(EngineError::InvalidPoint { lat: bad.lat, lng: bad.lng });
        }
        Ok(Self { ring })
    }

    fn contains(&self, point: Point) -> bool {
        let mut inside = false;
        let mut j = self.ring.len() - 1;
        for i in 0..self.ring.len() {
            let (a, b) = (self.ring[i], self.ring[j]);
            if (a.lat > point.lat) != (b.lat > point.lat) {
                let crossing_lng = a.lng + (point.lat - a.lat) * (b.lng - a.lng) / (b.lat - a.lat);
                if point.lng < crossing_lng {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl CrossingClassifier for PolygonDivide {
    fn classify(&self, point: Point) -> Side {
        if self.contains(point) { Side::A } else { Side::B }
    }
}

/// Divide definition as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DivideConfig {
    Line { points: Vec<Point> },
    Polygon { points: Vec<Point> },
}

impl DivideConfig {
    pub fn build(&self) -> Result<Arc<dyn CrossingClassifier>, EngineError> {
        let classifier: Arc<dyn CrossingClassifier> = match self {
            DivideConfig::Line { points } => Arc::new(LineDivide::new(points.clone())?),
            DivideConfig::Polygon { points } => Arc::new(PolygonDivide::new(points.clone())?),
        };
        Ok(classifier)
    }
}

fn cross(u: (f64, f64), v: (f64, f64)) -> f64 {
    u.0 * v.1 - u.1 * v.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> Point {
        Point { lat, lng }
    }

    /// North-running divide along lng 29.0; west is left, so west is A.
    fn meridian() -> LineDivide {
        LineDivide::new(vec![p(40.9, 29.0), p(41.2, 29.0)]).unwrap()
    }

    #[test]
    fn test_line_sides() {
        let divide = meridian();
        assert_eq!(divide.classify(p(41.0, 28.9)), Side::A);
        assert_eq!(divide.classify(p(41.0, 29.1)), Side::B);
        assert_eq!(divide.classify(p(41.0, 29.0)), Side::A);
    }

    #[test]
    fn test_line_beyond_endpoints_extends() {
        let divide = meridian();
        assert_eq!(divide.classify(p(41.5, 28.99)), Side::A);
        assert_eq!(divide.classify(p(40.5, 29.01)), Side::B);
    }

    #[test]
    fn test_line_vertex_wedges() {
        // Goes north, then turns east (a right turn at the corner).
        let divide = LineDivide::new(vec![p(41.0, 29.0), p(41.1, 29.0), p(41.1, 29.1)]).unwrap();
        // North-west of the corner: left of the northbound leg.
        assert_eq!(divide.classify(p(41.15, 28.95)), Side::A);
        // Inside the bend (south-east of the corner): right side.
        assert_eq!(divide.classify(p(41.05, 29.05)), Side::B);
        // North of the corner, just west of the northbound leg.
        assert_eq!(divide.classify(p(41.2, 28.99)), Side::A);
    }

    #[test]
    fn test_line_requires_two_points() {
        assert!(matches!(
            LineDivide::new(vec![p(41.0, 29.0)]),
            Err(EngineError::InvalidDivide(_))
        ));
        assert!(matches!(
            LineDivide::new(vec![p(41.0, 29.0), p(41.0, 29.0)]),
            Err(EngineError::InvalidDivide(_))
        ));
    }

    #[test]
    fn test_line_repeated_vertex_collapsed() {
        // North, then a left turn to the west, with the corner repeated.
        let divide = LineDivide::new(vec![p(41.0, 29.0), p(41.1, 29.0), p(41.1, 29.0), p(41.1, 28.9)]).unwrap();
        assert_eq!(divide.vertices.len(), 3);
        // Just outside the corner, on the right of both legs.
        assert_eq!(divide.classify(p(41.101, 29.001)), Side::B);
        // Inside the bend.
        assert_eq!(divide.classify(p(41.05, 28.95)), Side::A);
    }

    #[test]
    fn test_polygon_inside_outside() {
        let square = PolygonDivide::new(vec![p(41.0, 29.0), p(41.0, 29.1), p(41.1, 29.1), p(41.1, 29.0)]).unwrap();
        assert_eq!(square.classify(p(41.05, 29.05)), Side::A);
        assert_eq!(square.classify(p(41.2, 29.05)), Side::B);
        assert_eq!(square.classify(p(41.05, 28.9)), Side::B);
    }

    #[test]
    fn test_config_builds_classifier() {
        let config = DivideConfig::Line {
            points: vec![p(40.9, 29.0), p(41.2, 29.0)],
        };
        let classifier = config.build().unwrap();
        assert_eq!(classifier.classify(p(41.0, 28.5)), Side::A);

        let bad = DivideConfig::Polygon { points: vec![p(0.0, 0.0)] };
        assert!(bad.build().is_err());
    }

    #[test]
    fn test_preferred_side() {
        assert_eq!(Side::preferred(CrossingPreference::Any), None);
        assert_eq!(Side::preferred(CrossingPreference::PreferSideA), Some(Side::A));
        assert_eq!(Side::preferred(CrossingPreference::PreferSideB), Some(Side::B));
    }
}
