//! Retry wrapper for provider calls.
//!
//! Transient failures (timeouts, unreachable service) get a bounded number
//! of extra attempts with a fixed backoff. Rejections and malformed answers
//! are returned immediately since repeating the request won't change them.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{Cost, Point};
use crate::polyline::Polyline;
use crate::traits::NetworkDistanceProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Retrying<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: NetworkDistanceProvider> Retrying<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn run<T>(&self, op: &str, call: impl Fn(&P) -> Result<T, ProviderError>) -> Result<T, ProviderError> {
        let attempts = self.config.attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(&self.inner) {
                Err(err) if err.is_transient() && attempt < attempts => {
                    debug!(
                        provider = self.inner.name(),
                        op,
                        attempt,
                        error = %err,
                        "transient provider error, retrying"
                    );
                    thread::sleep(Duration::from_millis(self.config.backoff_ms));
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl<P: NetworkDistanceProvider> NetworkDistanceProvider for Retrying<P> {
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError> {
        self.run("matrix", |inner| inner.matrix(points))
    }

    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError> {
        self.run("geometry", |inner| inner.geometry(ordered))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
