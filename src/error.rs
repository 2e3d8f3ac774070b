//! Error taxonomy for the engine and its network provider boundary.

use thiserror::Error;

/// Hard failures returned to the caller of the engine.
///
/// Provider trouble never shows up here: it is absorbed by the fallback
/// paths and surfaced as `degraded = true` on the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No explicit, configured or last-known depot location resolved.
    #[error("no resolvable depot location")]
    NoDepot,

    /// Nothing left to route after stop resolution.
    #[error("no routable stops")]
    NoStops,

    /// Coordinate out of range or not a number.
    #[error("invalid point ({lat}, {lng})")]
    InvalidPoint { lat: f64, lng: f64 },

    /// Unresolvable shipments under the fail-fast policy.
    #[error("unresolved stops: {}", .0.join(", "))]
    UnresolvedStops(Vec<String>),

    #[error("invalid crossing divide: {0}")]
    InvalidDivide(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures at the network distance provider boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Service unreachable or returned a transport-level failure.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider timed out")]
    Timeout,

    /// Service answered but refused the request (e.g. `NoRoute`).
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// Service answered with something we could not use.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Timeout)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}
