//! Geocoded stop resolution.
//!
//! Turns shipment records into routable [`Stop`]s and picks the depot
//! location. Records that cannot be located are reported back, never
//! silently dropped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;
use crate::model::{Point, Stop};
use crate::traits::Shipment;

/// What to do with shipments that could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnresolvedPolicy {
    /// Route the rest and report the unresolved ids.
    #[default]
    Exclude,
    /// Fail the whole request.
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<I> {
    pub resolved: Vec<Stop<I>>,
    /// Index into the input records for each entry of `resolved`.
    pub sources: Vec<usize>,
    pub unresolved: Vec<I>,
}

/// Resolves `shipments` into stops.
///
/// With a non-empty `required` list only those ids are routed, and a
/// required id without any record is reported as unresolved. Resolved stops
/// keep the input record order.
pub fn resolve_stops<S: Shipment>(shipments: &[S], required: &[S::Id]) -> Resolution<S::Id> {
    let wanted: Option<HashSet<&S::Id>> = if required.is_empty() {
        None
    } else {
        Some(required.iter().collect())
    };

    let mut resolution = Resolution {
        resolved: Vec::new(),
        sources: Vec::new(),
        unresolved: Vec::new(),
    };
    let mut seen: HashSet<&S::Id> = HashSet::new();

    for (index, shipment) in shipments.iter().enumerate() {
        if wanted.as_ref().is_some_and(|wanted| !wanted.contains(shipment.id())) {
            continue;
        }
        seen.insert(shipment.id());

        match shipment.location().map(|(lat, lng)| Point::new(lat, lng)) {
            Some(Ok(point)) => {
                resolution.resolved.push(Stop {
                    id: shipment.id().clone(),
                    point,
                    kind: shipment.kind(),
                    weight: shipment.weight(),
                });
                resolution.sources.push(index);
            }
            Some(Err(err)) => {
                warn!(shipment = ?shipment.id(), error = %err, "shipment has unusable coordinates");
                resolution.unresolved.push(shipment.id().clone());
            }
            None => {
                warn!(shipment = ?shipment.id(), "shipment has no coordinates");
                resolution.unresolved.push(shipment.id().clone());
            }
        }
    }

    for id in required {
        if !seen.contains(id) {
            warn!(shipment = ?id, "required shipment has no record");
            resolution.unresolved.push(id.clone());
            seen.insert(id);
        }
    }

    resolution
}

/// Picks the route start: an explicit depot, then the configured default,
/// then the vehicle's last known position.
pub fn resolve_depot(
    explicit: Option<Point>,
    configured_default: Option<Point>,
    last_known: Option<Point>,
) -> Result<Point, EngineError> {
    let candidates = [
        ("explicit", explicit),
        ("configured default", configured_default),
        ("last known position", last_known),
    ];

    for (source, candidate) in candidates {
        let Some(point) = candidate else {
            continue;
        };
        if point.is_valid() {
            return Ok(point);
        }
        warn!(source, lat = point.lat, lng = point.lng, "ignoring invalid depot candidate");
    }

    Err(EngineError::NoDepot)
}
