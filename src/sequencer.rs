//! Visiting-order search for a single vehicle.
//!
//! Matrix indices follow [`RoutingRequest::matrix_points`]: 0 is the start,
//! `k + 1` is stop `k`, and `n + 1` is the end. The start and end are pinned;
//! only the stops in between are ever reordered.

use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::costs::{CostMatrix, CostMetric};
use crate::crossing::{CrossingClassifier, Side};
use crate::error::EngineError;
use crate::model::{RoutingRequest, SearchStats};
use crate::traits::Id;

/// Minimum gain for a 2-opt move to count as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-6;

/// How construction breaks ties between equally near stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// Smaller stop id first, then input position.
    #[default]
    SmallerId,
    /// Input position only.
    InputOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerOptions {
    /// Cap on full 2-opt passes; each pass tries O(n^2) moves.
    pub max_two_opt_passes: usize,
    pub tie_break: TieBreak,
    pub metric: CostMetric,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            max_two_opt_passes: 8,
            tie_break: TieBreak::SmallerId,
            metric: CostMetric::Distance,
        }
    }
}

/// Chosen visiting order as indices into `request.stops`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub order: Vec<usize>,
    pub stats: SearchStats,
}

pub fn sequence<I: Id>(
    request: &RoutingRequest<I>,
    matrix: &CostMatrix,
    classifier: Option<&dyn CrossingClassifier>,
    options: &SequencerOptions,
) -> Result<Sequence, EngineError> {
    let n = request.stops.len();
    if n == 0 {
        return Err(EngineError::NoStops);
    }
    if matrix.len() != n + 2 {
        return Err(EngineError::Config(format!(
            "cost matrix covers {} points, expected {}",
            matrix.len(),
            n + 2
        )));
    }

    let search = Search {
        matrix,
        metric: options.metric,
        end: n + 1,
    };

    if request.keep_order || n == 1 {
        let order: Vec<usize> = (0..n).collect();
        let cost = search.cost(&order);
        return Ok(Sequence {
            order,
            stats: SearchStats {
                constructed_cost: cost,
                final_cost: cost,
                ..SearchStats::default()
            },
        });
    }

    let mut order = search.nearest_neighbour(request, options.tie_break);
    let mut stats = SearchStats {
        constructed_cost: search.cost(&order),
        ..SearchStats::default()
    };

    let (passes, moves) = search.two_opt(&mut order, 0..n, options.max_two_opt_passes);
    stats.two_opt_passes += passes;
    stats.improving_moves += moves;

    match (Side::preferred(request.crossing_preference), classifier) {
        (Some(preferred), Some(classifier)) => {
            let sides: Vec<Side> = request
                .stops
                .iter()
                .map(|stop| classifier.classify(stop.point))
                .collect();
            if let Some(split) = prefer_side(&mut order, &sides, preferred) {
                let (passes, moves) = search.two_opt(&mut order, 0..split, options.max_two_opt_passes);
                stats.two_opt_passes += passes;
                stats.improving_moves += moves;
                let (passes, moves) = search.two_opt(&mut order, split..n, options.max_two_opt_passes);
                stats.two_opt_passes += passes;
                stats.improving_moves += moves;
                stats.crossing_applied = true;
            }
        }
        (Some(_), None) => {
            debug!("crossing preference set but no divide configured, ignoring");
        }
        (None, _) => {}
    }

    stats.final_cost = search.cost(&order);
    debug!(
        stops = n,
        constructed = stats.constructed_cost,
        final_cost = stats.final_cost,
        passes = stats.two_opt_passes,
        moves = stats.improving_moves,
        "sequence chosen"
    );

    Ok(Sequence { order, stats })
}

/// Stable partition putting `preferred` stops first. Returns the block
/// boundary when both sides have stops.
fn prefer_side(order: &mut Vec<usize>, sides: &[Side], preferred: Side) -> Option<usize> {
    let (mut first, second): (Vec<usize>, Vec<usize>) =
        order.iter().partition(|&&stop| sides[stop] == preferred);
    if first.is_empty() || second.is_empty() {
        return None;
    }
    let split = first.len();
    first.extend(second);
    *order = first;
    Some(split)
}

struct Search<'a> {
    matrix: &'a CostMatrix,
    metric: CostMetric,
    end: usize,
}

impl Search<'_> {
    fn weight(&self, from: usize, to: usize) -> f64 {
        self.matrix.weight(from, to, self.metric)
    }

    /// Cost of start -> stops in `order` -> end.
    fn cost(&self, order: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut prev = 0;
        for &stop in order {
            total += self.weight(prev, stop + 1);
            prev = stop + 1;
        }
        total + self.weight(prev, self.end)
    }

    /// Greedy tour from the start; the end is appended implicitly.
    fn nearest_neighbour<I: Id>(&self, request: &RoutingRequest<I>, tie_break: TieBreak) -> Vec<usize> {
        let n = request.stops.len();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut current = 0;

        while order.len() < n {
            let mut best: Option<(usize, f64)> = None;
            for candidate in (0..n).filter(|&k| !visited[k]) {
                let weight = self.weight(current, candidate + 1);
                let better = match best {
                    None => true,
                    Some((incumbent, best_weight)) => match weight.total_cmp(&best_weight) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => {
                            tie_key(request, tie_break, candidate) < tie_key(request, tie_break, incumbent)
                        }
                    },
                };
                if better {
                    best = Some((candidate, weight));
                }
            }

            let Some((next, _)) = best else {
                break;
            };
            visited[next] = true;
            order.push(next);
            current = next + 1;
        }

        order
    }

    /// First-improvement 2-opt over `positions` of `order`. Returns
    /// (passes run, moves accepted).
    fn two_opt(&self, order: &mut [usize], positions: Range<usize>, max_passes: usize) -> (usize, usize) {
        if positions.len() < 2 {
            return (0, 0);
        }

        let mut current = self.cost(order);
        let mut passes = 0;
        let mut moves = 0;

        while passes < max_passes {
            passes += 1;
            let mut improved = false;

            for i in positions.start..positions.end - 1 {
                for j in i + 1..positions.end {
                    order[i..=j].reverse();
                    let candidate = self.cost(order);
                    if candidate < current - IMPROVEMENT_EPSILON {
                        current = candidate;
                        moves += 1;
                        improved = true;
                    } else {
                        order[i..=j].reverse();
                    }
                }
            }

            if !improved {
                break;
            }
        }

        (passes, moves)
    }
}

fn tie_key<'r, I: Id>(request: &'r RoutingRequest<I>, tie_break: TieBreak, stop: usize) -> (Option<&'r I>, usize) {
    match tie_break {
        TieBreak::SmallerId => (Some(&request.stops[stop].id), stop),
        TieBreak::InputOrder => (None, stop),
    }
}
