//! Caller-facing optimization entry point.
//!
//! [`RouteEngine`] wires the stages together: depot and stop resolution,
//! cost matrix (with fallback), sequencing, and assembly. It holds no
//! per-request state, so one engine can serve any number of threads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::assembler::assemble;
use crate::cache::{CachedProvider, DistanceCache};
use crate::config::EngineConfig;
use crate::costs::CostMatrix;
use crate::crossing::CrossingClassifier;
use crate::error::EngineError;
use crate::model::{CrossingPreference, Leg, Point, RoutingRequest, SearchStats, StopKind};
use crate::osrm::OsrmClient;
use crate::resolver::{resolve_depot, resolve_stops, UnresolvedPolicy};
use crate::retry::Retrying;
use crate::sequencer;
use crate::traits::{NetworkDistanceProvider, Shipment};

#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    /// Departure from the start; enables per-stop ETAs.
    pub departure_time: Option<DateTime<Utc>>,
    pub crossing_preference: CrossingPreference,
    /// Where the route ends; defaults to the resolved start.
    pub end_location: Option<Point>,
    /// Trust the caller's order and only compute costs and geometry.
    pub keep_order: bool,
}

#[derive(Debug, Clone)]
pub struct OptimizeRequest<'a, S: Shipment> {
    /// Explicit depot for this route.
    pub vehicle_start: Option<Point>,
    /// Vehicle position used when neither an explicit nor a default depot resolves.
    pub last_known_position: Option<Point>,
    pub shipments: &'a [S],
    /// Restrict routing to these ids; empty means every shipment.
    pub required_ids: Vec<S::Id>,
    pub options: OptimizeOptions,
}

impl<'a, S: Shipment> OptimizeRequest<'a, S> {
    pub fn new(vehicle_start: Option<Point>, shipments: &'a [S]) -> Self {
        Self {
            vehicle_start,
            last_known_position: None,
            shipments,
            required_ids: Vec::new(),
            options: OptimizeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OptimizeOptions) -> Self {
        self.options = options;
        self
    }
}

/// A shipment in its optimized position. The depot return carries no
/// shipment and has `is_depot_return` set.
///
/// The shipment record is flattened into the serialized form next to the
/// routing fields, so records must serialize as maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedShipment<S> {
    #[serde(flatten)]
    pub shipment: Option<S>,
    pub route_order: usize,
    pub is_depot_return: bool,
    pub kind: StopKind,
    pub point: Point,
    pub cumulative_distance_meters: f64,
    pub cumulative_duration_seconds: f64,
    pub eta: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary<I> {
    pub legs: Vec<Leg<I>>,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse<S, I> {
    pub optimized_shipments: Vec<OptimizedShipment<S>>,
    pub routes: Vec<RouteSummary<I>>,
    pub unresolved: Vec<I>,
    /// Fallback costs or geometry were used somewhere in this result.
    pub degraded: bool,
    pub search: SearchStats,
}

impl<S, I> OptimizeResponse<S, I> {
    /// Shipments in visiting order, without the depot return.
    pub fn shipments_in_order(&self) -> impl Iterator<Item = &S> {
        self.optimized_shipments
            .iter()
            .filter_map(|entry| entry.shipment.as_ref())
    }
}

pub struct RouteEngine<P = Box<dyn NetworkDistanceProvider>> {
    config: EngineConfig,
    provider: P,
    classifier: Option<Arc<dyn CrossingClassifier>>,
}

impl RouteEngine<Box<dyn NetworkDistanceProvider>> {
    /// Builds the provider stack described by `config`: OSRM with retries
    /// when configured (haversine otherwise), behind the distance cache
    /// when one is configured.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let base: Box<dyn NetworkDistanceProvider> = match &config.osrm {
            Some(osrm) => {
                let client = OsrmClient::new(osrm.clone()).map_err(|err| EngineError::Config(err.to_string()))?;
                Box::new(Retrying::new(client, config.retry.clone()))
            }
            None => Box::new(config.haversine.clone()),
        };

        let provider: Box<dyn NetworkDistanceProvider> = match &config.cache {
            Some(cache) => Box::new(CachedProvider::new(base, DistanceCache::new(cache))),
            None => base,
        };

        Self::with_provider(config, provider)
    }
}

impl<P: NetworkDistanceProvider> RouteEngine<P> {
    /// Uses `provider` as-is; the divide, if any, still comes from `config`.
    pub fn with_provider(config: EngineConfig, provider: P) -> Result<Self, EngineError> {
        config.validate()?;
        let classifier = config.divide.as_ref().map(|divide| divide.build()).transpose()?;
        Ok(Self {
            config,
            provider,
            classifier,
        })
    }

    /// Replaces the configured divide with a custom classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn CrossingClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn optimize<S>(&self, request: OptimizeRequest<'_, S>) -> Result<OptimizeResponse<S, S::Id>, EngineError>
    where
        S: Shipment + Clone,
    {
        let span = info_span!(
            "optimize",
            shipments = request.shipments.len(),
            keep_order = request.options.keep_order
        );
        let _guard = span.enter();

        let start = resolve_depot(
            request.vehicle_start,
            self.config.default_depot,
            request.last_known_position,
        )?;
        let end = match request.options.end_location {
            Some(point) => Point::new(point.lat, point.lng)?,
            None => start,
        };

        let resolution = resolve_stops(request.shipments, &request.required_ids);
        if !resolution.unresolved.is_empty() {
            match self.config.unresolved_policy {
                UnresolvedPolicy::Fail => {
                    return Err(EngineError::UnresolvedStops(
                        resolution.unresolved.iter().map(|id| format!("{:?}", id)).collect(),
                    ));
                }
                UnresolvedPolicy::Exclude => {
                    warn!(count = resolution.unresolved.len(), "excluding unresolved shipments from route");
                }
            }
        }
        if resolution.resolved.is_empty() {
            return Err(EngineError::NoStops);
        }

        let routing = RoutingRequest {
            start,
            stops: resolution.resolved,
            end,
            crossing_preference: request.options.crossing_preference,
            keep_order: request.options.keep_order,
        };

        let matrix = CostMatrix::resolve(&self.provider, &routing.matrix_points(), &self.config.haversine);
        let sequence = sequencer::sequence(&routing, &matrix, self.classifier.as_deref(), &self.config.sequencer)?;
        let route = assemble(&routing, &sequence, &matrix, &self.provider, request.options.departure_time);

        let optimized_shipments = route
            .ordered_stops
            .iter()
            .map(|stop| {
                let shipment = if stop.is_depot_return {
                    None
                } else {
                    sequence
                        .order
                        .get(stop.route_order)
                        .and_then(|&index| resolution.sources.get(index))
                        .and_then(|&source| request.shipments.get(source))
                        .cloned()
                };
                OptimizedShipment {
                    shipment,
                    route_order: stop.route_order,
                    is_depot_return: stop.is_depot_return,
                    kind: stop.kind,
                    point: stop.point,
                    cumulative_distance_meters: stop.cumulative_distance_meters,
                    cumulative_duration_seconds: stop.cumulative_duration_seconds,
                    eta: stop.eta,
                }
            })
            .collect();

        info!(
            stops = routing.stops.len(),
            distance_m = route.total_distance_meters,
            duration_s = route.total_duration_seconds,
            degraded = route.degraded,
            "route optimized"
        );

        Ok(OptimizeResponse {
            optimized_shipments,
            routes: vec![RouteSummary {
                legs: route.legs,
                total_distance_meters: route.total_distance_meters,
                total_duration_seconds: route.total_duration_seconds,
            }],
            unresolved: resolution.unresolved,
            degraded: route.degraded,
            search: route.search,
        })
    }

    /// Optimizes independent requests in parallel. Results keep input order.
    pub fn optimize_batch<S>(
        &self,
        requests: Vec<OptimizeRequest<'_, S>>,
    ) -> Vec<Result<OptimizeResponse<S, S::Id>, EngineError>>
    where
        S: Shipment + Clone + Send + Sync,
    {
        requests
            .into_par_iter()
            .map(|request| self.optimize(request))
            .collect()
    }
}
