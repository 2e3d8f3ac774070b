//! OSRM client behaviour against a canned HTTP server.
//!
//! The server answers `/table` and `/route` with fixed bodies so response
//! parsing, status handling, timeouts and retries can be checked without a
//! routing service.

mod fixtures;

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use route_optimizer::config::EngineConfig;
use route_optimizer::osrm::{OsrmClient, OsrmConfig};
use route_optimizer::polyline::Polyline;
use route_optimizer::retry::{RetryConfig, Retrying};
use route_optimizer::traits::NetworkDistanceProvider;
use route_optimizer::{OptimizeRequest, Point, ProviderError, RouteEngine};

use fixtures::{Location, Parcel};

// ============================================================================
// Canned server
// ============================================================================

struct CannedOsrm {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedOsrm {
    fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind canned server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    break;
                };
                let path = read_request_path(&stream);
                seen.lock().expect("request log").push(path.clone());

                let (status, body) = respond(&path);
                let reason = if status == 200 { "OK" } else { "Error" };
                let _ = write!(
                    stream,
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.flush();
            }
        });

        Self { base_url, requests }
    }

    fn config(&self) -> OsrmConfig {
        OsrmConfig {
            base_url: self.base_url.clone(),
            profile: "car".to_string(),
            timeout_secs: 5,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

fn read_request_path(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return String::new();
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }
    request_line.split_whitespace().nth(1).unwrap_or_default().to_string()
}

// ============================================================================
// Canned bodies
// ============================================================================

fn origin() -> Point {
    Point { lat: 41.0, lng: 29.0 }
}

fn two_parcels() -> Vec<Parcel> {
    vec![
        Parcel::at(1, &Location::new("A", 41.01, 29.01)),
        Parcel::at(2, &Location::new("B", 40.99, 29.02)),
    ]
}

/// Start, A, B, end (= start). A is nearest to the start.
fn table_body() -> String {
    serde_json::json!({
        "code": "Ok",
        "durations": [
            [0.0, 100.0, 300.0, 0.0],
            [100.0, 0.0, 150.0, 100.0],
            [300.0, 150.0, 0.0, 300.0],
            [0.0, 100.0, 300.0, 0.0]
        ],
        "distances": [
            [0.0, 1000.0, 3000.0, 0.0],
            [1000.0, 0.0, 1500.0, 1000.0],
            [3000.0, 1500.0, 0.0, 3000.0],
            [0.0, 1000.0, 3000.0, 0.0]
        ]
    })
    .to_string()
}

/// One leg per hop, each split over two steps that share a joint.
fn route_body(legs: usize) -> String {
    let legs: Vec<_> = (0..legs)
        .map(|leg| {
            let base = 41.0 + leg as f64 * 0.01;
            let first = Polyline::new(vec![
                Point { lat: base, lng: 29.0 },
                Point { lat: base + 0.005, lng: 29.0 },
            ]);
            let second = Polyline::new(vec![
                Point { lat: base + 0.005, lng: 29.0 },
                Point { lat: base + 0.01, lng: 29.005 },
            ]);
            serde_json::json!({
                "steps": [
                    {"geometry": first.encode(6)},
                    {"geometry": second.encode(6)}
                ]
            })
        })
        .collect();
    serde_json::json!({"code": "Ok", "routes": [{"legs": legs}]}).to_string()
}

fn healthy(path: &str) -> (u16, String) {
    if path.starts_with("/table/") {
        (200, table_body())
    } else if path.starts_with("/route/") {
        (200, route_body(3))
    } else {
        (404, "not found".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn table_parsed_with_unreachable_cells_as_nan() {
    let server = CannedOsrm::start(|_| {
        let body = serde_json::json!({
            "code": "Ok",
            "durations": [[0.0, 60.0], [null, 0.0]],
            "distances": [[0.0, 800.0], [null, 0.0]]
        });
        (200, body.to_string())
    });
    let client = OsrmClient::new(server.config()).unwrap();

    let matrix = client
        .matrix(&[origin(), Point { lat: 41.01, lng: 29.01 }])
        .unwrap();
    assert_eq!(matrix[0][1].distance_meters, 800.0);
    assert_eq!(matrix[0][1].duration_seconds, 60.0);
    assert!(matrix[1][0].distance_meters.is_nan());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("/table/v1/car/29.000000,41.000000;29.010000,41.010000"));
    assert!(requests[0].contains("annotations=duration,distance"));
}

#[test]
fn route_steps_joined_per_leg() {
    let server = CannedOsrm::start(|_| (200, route_body(2)));
    let client = OsrmClient::new(server.config()).unwrap();

    let legs = client
        .geometry(&[origin(), Point { lat: 41.01, lng: 29.0 }, Point { lat: 41.02, lng: 29.0 }])
        .unwrap();
    assert_eq!(legs.len(), 2);
    // Two steps of two points sharing a joint.
    assert_eq!(legs[0].points().len(), 3);
    assert!(server.requests()[0].contains("geometries=polyline6"));
}

#[test]
fn error_code_is_rejected() {
    let server = CannedOsrm::start(|_| {
        (400, r#"{"code":"InvalidQuery","message":"Query string malformed"}"#.to_string())
    });
    let client = OsrmClient::new(server.config()).unwrap();

    let err = client.matrix(&[origin(), origin()]).unwrap_err();
    assert_eq!(
        err,
        ProviderError::Rejected("InvalidQuery: Query string malformed".to_string())
    );
    assert!(!err.is_transient());
}

#[test]
fn server_error_retried_once() {
    let server = CannedOsrm::start(|_| (502, "<html>bad gateway</html>".to_string()));
    let client = OsrmClient::new(server.config()).unwrap();
    let retrying = Retrying::new(
        client,
        RetryConfig {
            attempts: 2,
            backoff_ms: 0,
        },
    );

    let err = retrying.matrix(&[origin(), origin()]).unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn engine_routes_over_osrm() {
    let server = CannedOsrm::start(healthy);
    let config = EngineConfig {
        osrm: Some(server.config()),
        ..EngineConfig::default()
    };
    let engine = RouteEngine::from_config(config).unwrap();
    let parcels = two_parcels();

    let response = engine.optimize(OptimizeRequest::new(Some(origin()), &parcels)).unwrap();

    assert!(!response.degraded);
    let ids: Vec<u32> = response.shipments_in_order().map(|parcel| parcel.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let route = &response.routes[0];
    assert_eq!(route.total_distance_meters, 5500.0);
    assert_eq!(route.total_duration_seconds, 550.0);
    assert_eq!(route.legs[1].distance_meters, 1500.0);
    for leg in &route.legs {
        assert_eq!(leg.geometry.points().len(), 3);
    }
}

#[test]
fn engine_degrades_when_osrm_rejects() {
    let server = CannedOsrm::start(|_| (200, r#"{"code":"NoTable","message":"no table"}"#.to_string()));
    let config = EngineConfig {
        osrm: Some(server.config()),
        ..EngineConfig::default()
    };
    let engine = RouteEngine::from_config(config).unwrap();
    let parcels = two_parcels();

    let response = engine.optimize(OptimizeRequest::new(Some(origin()), &parcels)).unwrap();

    assert!(response.degraded);
    assert_eq!(response.shipments_in_order().count(), 2);
    // Rejections are not retried: one table and one route request.
    assert_eq!(server.requests().len(), 2);
}

fn stalled(_path: &str) -> (u16, String) {
    thread::sleep(Duration::from_millis(2500));
    (200, table_body())
}

#[test]
fn slow_server_times_out() {
    let server = CannedOsrm::start(stalled);
    let client = OsrmClient::new(OsrmConfig {
        timeout_secs: 1,
        ..server.config()
    })
    .unwrap();

    let err = client.matrix(&[origin(), origin()]).unwrap_err();
    assert_eq!(err, ProviderError::Timeout);
    assert!(err.is_transient());
}

#[test]
fn engine_degrades_when_osrm_times_out() {
    let server = CannedOsrm::start(stalled);
    let config = EngineConfig {
        osrm: Some(OsrmConfig {
            timeout_secs: 1,
            ..server.config()
        }),
        retry: RetryConfig {
            attempts: 2,
            backoff_ms: 0,
        },
        ..EngineConfig::default()
    };
    let engine = RouteEngine::from_config(config).unwrap();
    let parcels = two_parcels();

    let response = engine.optimize(OptimizeRequest::new(Some(origin()), &parcels)).unwrap();

    assert!(response.degraded);
    let ids: Vec<u32> = response.shipments_in_order().map(|parcel| parcel.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(response.routes[0].total_distance_meters > 0.0);
    for leg in &response.routes[0].legs {
        assert_eq!(leg.geometry.points().len(), 2);
    }
}
