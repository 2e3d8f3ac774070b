//! Engine configuration.
//!
//! Everything the engine would otherwise hard-code (the fallback depot, the
//! routing service, cache bounds, search limits) is injected here. Loadable
//! from JSON or from `ROUTE_*` environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::crossing::DivideConfig;
use crate::error::EngineError;
use crate::haversine::HaversineMatrix;
use crate::model::Point;
use crate::osrm::OsrmConfig;
use crate::resolver::UnresolvedPolicy;
use crate::retry::RetryConfig;
use crate::sequencer::SequencerOptions;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Depot used when a request names no explicit start.
    pub default_depot: Option<Point>,
    /// Road-network service; haversine-only when absent.
    pub osrm: Option<OsrmConfig>,
    /// Fallback cost model.
    pub haversine: HaversineMatrix,
    pub retry: RetryConfig,
    /// Distance cache; disabled when absent.
    pub cache: Option<CacheConfig>,
    pub sequencer: SequencerOptions,
    pub divide: Option<DivideConfig>,
    pub unresolved_policy: UnresolvedPolicy,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(raw).map_err(|err| EngineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ROUTE_OSRM_URL") {
            let mut osrm = OsrmConfig {
                base_url: url,
                ..OsrmConfig::default()
            };
            if let Some(profile) = lookup("ROUTE_OSRM_PROFILE") {
                osrm.profile = profile;
            }
            if let Some(timeout) = parse_var(&lookup, "ROUTE_OSRM_TIMEOUT_SECS")? {
                osrm.timeout_secs = timeout;
            }
            config.osrm = Some(osrm);
        }

        if let Some(raw) = lookup("ROUTE_DEFAULT_DEPOT") {
            config.default_depot = Some(parse_point(&raw)?);
        }

        let ttl: Option<u64> = parse_var(&lookup, "ROUTE_CACHE_TTL_SECS")?;
        let max_entries: Option<usize> = parse_var(&lookup, "ROUTE_CACHE_MAX_ENTRIES")?;
        if ttl.is_some() || max_entries.is_some() {
            let defaults = CacheConfig::default();
            config.cache = Some(CacheConfig {
                ttl_secs: ttl.unwrap_or(defaults.ttl_secs),
                max_entries: max_entries.unwrap_or(defaults.max_entries),
            });
        }

        if let Some(passes) = parse_var(&lookup, "ROUTE_MAX_TWO_OPT_PASSES")? {
            config.sequencer.max_two_opt_passes = passes;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(depot) = self.default_depot {
            Point::new(depot.lat, depot.lng)?;
        }
        if !(self.haversine.speed_kmh.is_finite() && self.haversine.speed_kmh > 0.0) {
            return Err(EngineError::Config("haversine speed must be positive".into()));
        }
        if !(self.haversine.detour_factor.is_finite() && self.haversine.detour_factor > 0.0) {
            return Err(EngineError::Config("haversine detour factor must be positive".into()));
        }
        if let Some(divide) = &self.divide {
            divide.build()?;
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, EngineError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| EngineError::Config(format!("{} has invalid value {:?}", key, raw)))
        })
        .transpose()
}

/// Parses "lat,lng".
fn parse_point(raw: &str) -> Result<Point, EngineError> {
    let invalid = || EngineError::Config(format!("expected \"lat,lng\", got {:?}", raw));
    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    Point::new(lat, lng)
}
