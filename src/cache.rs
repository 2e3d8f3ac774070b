//! Bounded TTL cache for pairwise travel costs.
//!
//! Keys are pairs of points rounded to about a metre, so repeated requests
//! over the same depots and customers reuse earlier matrix answers. Reads
//! and writes go through a sharded concurrent map; nothing here ever waits
//! on the network. A cache that is full after purging expired entries just
//! stops accepting new ones until entries age out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{Cost, Point};
use crate::polyline::Polyline;
use crate::traits::NetworkDistanceProvider;

type PairKey = ((i64, i64), (i64, i64));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 15 * 60,
            max_entries: 100_000,
        }
    }
}

/// Shared pair-cost cache. Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct DistanceCache {
    entries: Arc<DashMap<PairKey, (Cost, Instant)>>,
    ttl: Duration,
    max_entries: usize,
}

impl DistanceCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, from: Point, to: Point) -> Option<Cost> {
        let entry = self.entries.get(&pair_key(from, to))?;
        let (cost, stored_at) = *entry.value();
        if stored_at.elapsed() <= self.ttl {
            Some(cost)
        } else {
            None
        }
    }

    /// Stores `cost`; returns false when the cache is full.
    pub fn insert(&self, from: Point, to: Point, cost: Cost) -> bool {
        let key = pair_key(from, to);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                return false;
            }
        }
        self.entries.insert(key, (cost, Instant::now()));
        true
    }

    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, (_, stored_at)| stored_at.elapsed() <= ttl);
    }

    /// Full off-diagonal matrix from cache, or `None` on any miss.
    fn lookup_matrix(&self, points: &[Point]) -> Option<Vec<Vec<Cost>>> {
        points
            .iter()
            .enumerate()
            .map(|(i, from)| {
                points
                    .iter()
                    .enumerate()
                    .map(|(j, to)| if i == j { Some(Cost::ZERO) } else { self.get(*from, *to) })
                    .collect::<Option<Vec<_>>>()
            })
            .collect()
    }

    /// Stores the usable off-diagonal cells of a provider matrix.
    fn store_matrix(&self, points: &[Point], matrix: &[Vec<Cost>]) {
        for (i, row) in matrix.iter().enumerate() {
            for (j, cost) in row.iter().enumerate() {
                if i == j || !cost.is_sane() {
                    continue;
                }
                let (Some(from), Some(to)) = (points.get(i), points.get(j)) else {
                    continue;
                };
                if !self.insert(*from, *to, *cost) {
                    debug!("distance cache full, skipping remaining inserts");
                    return;
                }
            }
        }
    }
}

fn pair_key(from: Point, to: Point) -> PairKey {
    (from.rounded_key(), to.rounded_key())
}

/// Provider wrapper answering matrices from a [`DistanceCache`] when every
/// pair is present, and falling through to the inner provider otherwise.
#[derive(Debug, Clone)]
pub struct CachedProvider<P> {
    inner: P,
    cache: DistanceCache,
}

impl<P: NetworkDistanceProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: DistanceCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: NetworkDistanceProvider> NetworkDistanceProvider for CachedProvider<P> {
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError> {
        if let Some(matrix) = self.cache.lookup_matrix(points) {
            debug!(points = points.len(), "matrix served from cache");
            return Ok(matrix);
        }

        let matrix = self.inner.matrix(points)?;
        self.cache.store_matrix(points, &matrix);
        Ok(matrix)
    }

    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError> {
        self.inner.geometry(ordered)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
