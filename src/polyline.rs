//! Polyline representation for leg geometries.
//!
//! Geometry is carried as decoded points inside the engine. The compact
//! encoded-polyline format only appears at the OSRM boundary, via
//! [`Polyline::decode`] and [`Polyline::encode`].

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::Point;

/// A leg geometry as an ordered list of points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Two-point straight line, used when no road geometry is available.
    pub fn straight(from: Point, to: Point) -> Self {
        Self {
            points: vec![from, to],
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends `other`, dropping its first point when it repeats our last.
    pub fn extend_joined(&mut self, other: Polyline) {
        let mut incoming = other.points.into_iter().peekable();
        if let (Some(last), Some(first)) = (self.points.last(), incoming.peek()) {
            if last == first {
                incoming.next();
            }
        }
        self.points.extend(incoming);
    }

    /// Decodes a Google encoded polyline with `precision` decimal digits
    /// (5 for the classic format, 6 for OSRM's `polyline6`).
    pub fn decode(encoded: &str, precision: u32) -> Result<Self, ProviderError> {
        let factor = 10_f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut cursor = 0;
        let mut lat = 0i64;
        let mut lng = 0i64;
        let mut points = Vec::new();

        while cursor < bytes.len() {
            lat += decode_value(bytes, &mut cursor)?;
            lng += decode_value(bytes, &mut cursor)?;
            points.push(Point {
                lat: lat as f64 / factor,
                lng: lng as f64 / factor,
            });
        }

        Ok(Self { points })
    }

    pub fn encode(&self, precision: u32) -> String {
        let factor = 10_f64.powi(precision as i32);
        let mut out = String::new();
        let mut prev_lat = 0i64;
        let mut prev_lng = 0i64;

        for point in &self.points {
            let lat = (point.lat * factor).round() as i64;
            let lng = (point.lng * factor).round() as i64;
            encode_value(lat - prev_lat, &mut out);
            encode_value(lng - prev_lng, &mut out);
            prev_lat = lat;
            prev_lng = lng;
        }

        out
    }
}

fn decode_value(bytes: &[u8], cursor: &mut usize) -> Result<i64, ProviderError> {
    let mut shift = 0;
    let mut result = 0i64;
    loop {
        let Some(&byte) = bytes.get(*cursor) else {
            return Err(ProviderError::Malformed("truncated polyline".into()));
        };
        if !(63..127).contains(&byte) || shift > 60 {
            return Err(ProviderError::Malformed("invalid polyline character".into()));
        }
        *cursor += 1;
        let chunk = i64::from(byte) - 63;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push(char::from((((v & 0x1f) | 0x20) + 63) as u8));
        v >>= 5;
    }
    out.push(char::from((v + 63) as u8));
}
