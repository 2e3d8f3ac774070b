//! OSRM HTTP adapter for cost matrices and leg geometry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{Cost, Point};
use crate::polyline::Polyline;
use crate::traits::NetworkDistanceProvider;

/// Precision of OSRM's `polyline6` geometry encoding.
const POLYLINE6_PRECISION: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn url(&self, service: &str, points: &[Point], query: &str) -> String {
        let coords = points
            .iter()
            .map(|point| format!("{:.6},{:.6}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/{}/v1/{}/{}?{}",
            self.config.base_url.trim_end_matches('/'),
            service,
            self.config.profile,
            coords,
            query
        )
    }

    /// Fetches `url` and decodes it, mapping OSRM's `code` field to errors.
    fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        let envelope: OsrmStatus = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
            }
            Err(err) => return Err(ProviderError::Malformed(err.to_string())),
        };

        if envelope.code != "Ok" {
            let message = envelope.message.unwrap_or_default();
            return Err(ProviderError::Rejected(format!("{}: {}", envelope.code, message)));
        }

        serde_json::from_str(&body).map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

impl NetworkDistanceProvider for OsrmClient {
    fn matrix(&self, points: &[Point]) -> Result<Vec<Vec<Cost>>, ProviderError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url("table", points, "annotations=duration,distance");
        debug!(points = points.len(), "requesting OSRM table");
        let body: OsrmTableResponse = self.fetch(&url)?;

        let durations = body
            .durations
            .ok_or_else(|| ProviderError::Malformed("table response without durations".into()))?;
        let distances = body
            .distances
            .ok_or_else(|| ProviderError::Malformed("table response without distances".into()))?;

        // Unreachable pairs come back as null; NaN marks them for patching.
        Ok(durations
            .into_iter()
            .zip(distances)
            .map(|(duration_row, distance_row)| {
                duration_row
                    .into_iter()
                    .zip(distance_row)
                    .map(|(duration, distance)| {
                        Cost::new(distance.unwrap_or(f64::NAN), duration.unwrap_or(f64::NAN))
                    })
                    .collect()
            })
            .collect())
    }

    fn geometry(&self, ordered: &[Point]) -> Result<Vec<Polyline>, ProviderError> {
        if ordered.len() < 2 {
            return Ok(Vec::new());
        }

        let url = self.url("route", ordered, "overview=false&steps=true&geometries=polyline6");
        debug!(points = ordered.len(), "requesting OSRM route geometry");
        let body: OsrmRouteResponse = self.fetch(&url)?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("route response without routes".into()))?;

        route
            .legs
            .into_iter()
            .map(|leg| {
                let mut polyline = Polyline::default();
                for step in leg.steps {
                    polyline.extend_joined(Polyline::decode(&step.geometry, POLYLINE6_PRECISION)?);
                }
                Ok(polyline)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "osrm"
    }
}

#[derive(Debug, Deserialize)]
struct OsrmStatus {
    code: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    geometry: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_uses_lng_lat_order() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://osrm.local/".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap();
        let url = client.url(
            "table",
            &[Point { lat: 41.0, lng: 29.0 }, Point { lat: 41.01, lng: 29.02 }],
            "annotations=duration,distance",
        );
        assert_eq!(
            url,
            "http://osrm.local/table/v1/car/29.000000,41.000000;29.020000,41.010000?annotations=duration,distance"
        );
    }

    #[test]
    fn test_empty_inputs_skip_network() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap();
        assert!(client.matrix(&[]).unwrap().is_empty());
        assert!(client.geometry(&[Point { lat: 41.0, lng: 29.0 }]).unwrap().is_empty());
    }
}
