//! Route assembly: legs, timing and the synthetic depot return.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use crate::costs::CostMatrix;
use crate::haversine::HaversineMatrix;
use crate::model::{Leg, RouteResult, RoutedStop, RoutingRequest, StopKind};
use crate::sequencer::Sequence;
use crate::traits::{Id, NetworkDistanceProvider};

/// Builds the final [`RouteResult`] for `sequence`.
///
/// Geometry is requested once for the whole path; if that fails, or comes
/// back with the wrong number of legs, straight lines are used instead and
/// the result is marked degraded.
pub fn assemble<I, P>(
    request: &RoutingRequest<I>,
    sequence: &Sequence,
    matrix: &CostMatrix,
    provider: &P,
    departure_time: Option<DateTime<Utc>>,
) -> RouteResult<I>
where
    I: Id,
    P: NetworkDistanceProvider + ?Sized,
{
    let n = request.stops.len();
    let end = n + 1;

    let mut path = Vec::with_capacity(n + 2);
    path.push(0);
    path.extend(sequence.order.iter().map(|&stop| stop + 1));
    path.push(end);

    let points = path
        .iter()
        .map(|&index| match index {
            0 => request.start,
            index if index == end => request.end,
            index => request.stops[index - 1].point,
        })
        .collect::<Vec<_>>();

    let (geometries, geometry_degraded) = match provider.geometry(&points) {
        Ok(legs) if legs.len() == points.len() - 1 => (legs, false),
        Ok(legs) => {
            warn!(
                provider = provider.name(),
                expected = points.len() - 1,
                got = legs.len(),
                "geometry leg count mismatch, using straight lines"
            );
            (HaversineMatrix::straight_legs(&points), true)
        }
        Err(err) => {
            warn!(provider = provider.name(), error = %err, "geometry request failed, using straight lines");
            (HaversineMatrix::straight_legs(&points), true)
        }
    };

    let stop_id = |index: usize| -> Option<I> {
        if index == 0 || index == end {
            None
        } else {
            Some(request.stops[index - 1].id.clone())
        }
    };

    let mut legs = Vec::with_capacity(n + 1);
    let mut ordered_stops = Vec::with_capacity(n + 1);
    let mut distance = 0.0;
    let mut duration = 0.0;
    let mut eta_overflow_logged = false;

    for (position, (pair, geometry)) in path.windows(2).zip(geometries).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let cost = matrix.get(from, to);
        distance += cost.distance_meters;
        duration += cost.duration_seconds;

        legs.push(Leg {
            from_stop_id: stop_id(from),
            to_stop_id: stop_id(to),
            distance_meters: cost.distance_meters,
            duration_seconds: cost.duration_seconds,
            geometry,
        });

        let eta = departure_time.and_then(|departure| eta_after(departure, duration));
        if departure_time.is_some() && eta.is_none() && !eta_overflow_logged {
            warn!(duration_s = duration, "cumulative duration out of range, leaving ETAs unset");
            eta_overflow_logged = true;
        }
        let routed = if to == end {
            RoutedStop {
                shipment_id: None,
                point: request.end,
                kind: StopKind::DepotReturn,
                weight: None,
                route_order: position,
                is_depot_return: true,
                cumulative_distance_meters: distance,
                cumulative_duration_seconds: duration,
                eta,
            }
        } else {
            let stop = &request.stops[to - 1];
            RoutedStop {
                shipment_id: Some(stop.id.clone()),
                point: stop.point,
                kind: stop.kind,
                weight: stop.weight,
                route_order: position,
                is_depot_return: false,
                cumulative_distance_meters: distance,
                cumulative_duration_seconds: duration,
                eta,
            }
        };
        ordered_stops.push(routed);
    }

    RouteResult {
        ordered_stops,
        legs,
        total_distance_meters: distance,
        total_duration_seconds: duration,
        degraded: matrix.is_degraded() || geometry_degraded,
        search: sequence.stats,
    }
}

/// `departure` plus `seconds`, or `None` when that is not a representable time.
fn eta_after(departure: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    let offset = TimeDelta::try_milliseconds((seconds * 1000.0).round() as i64)?;
    departure.checked_add_signed(offset)
}
