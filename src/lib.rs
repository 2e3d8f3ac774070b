//! route-optimizer
//!
//! Single-vehicle route optimization: resolves shipments into routable
//! stops, orders them against a road-network cost matrix, and assembles
//! legs, geometry and timing for the chosen order.

pub mod assembler;
pub mod cache;
pub mod config;
pub mod costs;
pub mod crossing;
pub mod engine;
pub mod error;
pub mod haversine;
pub mod model;
pub mod osrm;
pub mod polyline;
pub mod resolver;
pub mod retry;
pub mod sequencer;
pub mod traits;

pub use engine::{OptimizeOptions, OptimizeRequest, OptimizeResponse, OptimizedShipment, RouteEngine};
pub use error::{EngineError, ProviderError};
pub use model::{CrossingPreference, Point, RouteResult, Stop, StopKind};
