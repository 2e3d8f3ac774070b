//! Test fixtures for route-optimizer.
//!
//! Provides realistic test data including:
//! - Real Istanbul locations on both shores of the Bosphorus
//! - A shipment record type and builders

pub mod istanbul_locations;

pub use istanbul_locations::*;

use route_optimizer::traits::Shipment;
use route_optimizer::StopKind;
use serde::Serialize;

/// Shipment record as a dispatch system would hand it over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: u32,
    pub recipient: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub pickup: bool,
    pub weight_kg: Option<f64>,
}

impl Parcel {
    pub fn at(id: u32, location: &Location) -> Self {
        Self {
            id,
            recipient: location.name.to_string(),
            lat: Some(location.lat),
            lng: Some(location.lng),
            pickup: false,
            weight_kg: None,
        }
    }

    pub fn unlocated(id: u32) -> Self {
        Self {
            id,
            recipient: "unknown".to_string(),
            lat: None,
            lng: None,
            pickup: false,
            weight_kg: None,
        }
    }
}

impl Shipment for Parcel {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.id
    }

    fn location(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }

    fn kind(&self) -> StopKind {
        if self.pickup {
            StopKind::Pickup
        } else {
            StopKind::Delivery
        }
    }

    fn weight(&self) -> Option<f64> {
        self.weight_kg
    }
}

/// One parcel per location, ids starting at 1.
pub fn parcels(locations: &[Location]) -> Vec<Parcel> {
    locations
        .iter()
        .enumerate()
        .map(|(index, location)| Parcel::at(index as u32 + 1, location))
        .collect()
}
