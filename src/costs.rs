//! Cost matrix used by the sequencer, with provider fallback.
//!
//! Provider output is never trusted as-is: a failed call or a wrongly
//! shaped matrix is replaced by haversine estimates, and individual
//! unusable cells are patched the same way. Either case marks the matrix
//! degraded.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::haversine::HaversineMatrix;
use crate::model::{Cost, Point};
use crate::traits::NetworkDistanceProvider;

/// Which component of [`Cost`] the search minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostMetric {
    #[default]
    Distance,
    Duration,
}

impl CostMetric {
    pub fn of(self, cost: Cost) -> f64 {
        match self {
            CostMetric::Distance => cost.distance_meters,
            CostMetric::Duration => cost.duration_seconds,
        }
    }
}

/// Square matrix of travel costs indexed by point position.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    cells: Vec<Vec<Cost>>,
    degraded: bool,
}

impl CostMatrix {
    /// Wraps an already validated square matrix.
    pub fn from_cells(cells: Vec<Vec<Cost>>) -> Self {
        Self {
            cells,
            degraded: false,
        }
    }

    /// Asks `provider` for costs over `points`, falling back to `fallback`
    /// wherever the answer is missing or unusable.
    pub fn resolve<P>(provider: &P, points: &[Point], fallback: &HaversineMatrix) -> Self
    where
        P: NetworkDistanceProvider + ?Sized,
    {
        let n = points.len();
        let cells = match provider.matrix(points) {
            Ok(cells) if is_square(&cells, n) => cells,
            Ok(cells) => {
                warn!(
                    provider = provider.name(),
                    expected = n,
                    rows = cells.len(),
                    "matrix has wrong shape, using haversine costs"
                );
                return Self {
                    cells: fallback.costs_for(points),
                    degraded: true,
                };
            }
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "matrix request failed, using haversine costs");
                return Self {
                    cells: fallback.costs_for(points),
                    degraded: true,
                };
            }
        };

        let mut matrix = Self {
            cells,
            degraded: false,
        };
        let patched = matrix.patch_cells(points, fallback);
        if patched > 0 {
            warn!(provider = provider.name(), patched, "patched unusable matrix cells with haversine costs");
            matrix.degraded = true;
        } else {
            debug!(provider = provider.name(), size = n, "matrix resolved");
        }
        matrix
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn get(&self, from: usize, to: usize) -> Cost {
        self.cells[from][to]
    }

    pub fn weight(&self, from: usize, to: usize, metric: CostMetric) -> f64 {
        metric.of(self.get(from, to))
    }

    /// Total metric along `path` (matrix indices, visited in order).
    pub fn path_cost(&self, path: &[usize], metric: CostMetric) -> f64 {
        path.windows(2)
            .map(|pair| self.weight(pair[0], pair[1], metric))
            .sum()
    }

    /// Replaces non-finite/negative cells and forces a zero diagonal.
    /// Returns the number of off-diagonal cells replaced.
    fn patch_cells(&mut self, points: &[Point], fallback: &HaversineMatrix) -> usize {
        let mut patched = 0;
        for (i, row) in self.cells.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if i == j {
                    *cell = Cost::ZERO;
                } else if !cell.is_sane() {
                    *cell = fallback.cost(points[i], points[j]);
                    patched += 1;
                }
            }
        }
        patched
    }
}

fn is_square(cells: &[Vec<Cost>], n: usize) -> bool {
    cells.len() == n && cells.iter().all(|row| row.len() == n)
}
