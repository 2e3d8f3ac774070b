//! Istanbul locations for realistic test fixtures.
//!
//! Coordinates are approximate district centres taken from OpenStreetMap.
//! They route with an OSRM build of the Turkey extract.

use route_optimizer::Point;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> Point {
        Point {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const DEPOT_LEVENT: Location = Location::new("Levent depot", 41.0800, 29.0100);
pub const DEPOT_ATASEHIR: Location = Location::new("Ataşehir depot", 40.9923, 29.1244);

// ============================================================================
// European side
// ============================================================================

pub const EUROPE: &[Location] = &[
    Location::new("Sultanahmet", 41.0054, 28.9768),
    Location::new("Şişli", 41.0602, 28.9877),
    Location::new("Bakırköy", 40.9800, 28.8720),
    Location::new("Fatih", 41.0186, 28.9397),
    Location::new("Zeytinburnu", 40.9940, 28.9040),
];

// ============================================================================
// Asian side
// ============================================================================

pub const ASIA: &[Location] = &[
    Location::new("Kadıköy", 40.9903, 29.0290),
    Location::new("Üsküdar", 41.0260, 29.0150),
    Location::new("Ataşehir", 40.9845, 29.1070),
    Location::new("Maltepe", 40.9350, 29.1300),
    Location::new("Beykoz", 41.1340, 29.0920),
];

/// Simplified divide between the shores, drawn south to north so the
/// European side lies to the left.
pub fn bosphorus() -> Vec<Point> {
    vec![
        Point { lat: 40.85, lng: 29.000 },
        Point { lat: 41.00, lng: 29.000 },
        Point { lat: 41.05, lng: 29.005 },
        Point { lat: 41.10, lng: 29.050 },
        Point { lat: 41.25, lng: 29.070 },
    ]
}
