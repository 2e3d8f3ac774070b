//! Collaborator seams for the engine.
//!
//! Shipments come from an external store and road costs from an external
//! routing service. Both are consumed only through these traits so callers
//! can plug in their own records and providers (or fakes in tests).

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::ProviderError;
use crate::model::{Cost, Point, StopKind};
use crate::polyline::Polyline;

/// Identifier for shipments. Ordered so tie-breaks are deterministic.
pub trait Id: Clone + Eq + Ord + Hash + Debug + Send + Sync {}

impl<T> Id for T where T: Clone + Eq + Ord + Hash + Debug + Send + Sync {}

/// A shipment record owned by the external shipment store.
pub trait Shipment {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    /// Delivery coordinates (lat, lng), if the record has been geocoded.
    fn location(&self) -> Option<(f64, f64)>;

    fn kind(&self) -> StopKind {
        StopKind::Delivery
    }

    fn weight(&self) -> Option<f64> {
        None
    }
}

/// Road-network costs and geometry.
///
/// Matrices are indexed by the order of `points` and may be asymmetric.
pub trait NetworkDistanceProvider: Send + Sync {
    /// Pairwise travel costs; `matrix[i][j]` is from `points[i]` to `points[j]`.
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError>;

    /// Turn-level geometry for an ordered path, one polyline per
    /// consecutive pair of points.
    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

impl<P> NetworkDistanceProvider for Box<P>
where
    P: NetworkDistanceProvider + ?Sized,
{
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError> {
        (**self).matrix(points)
    }

    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError> {
        (**self).geometry(ordered)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
