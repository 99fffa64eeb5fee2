// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS fixes, route points, and route export (polyline / GeoJSON).

use geo::{Coord, LineString};
use geojson::{Feature, Geometry, JsonObject};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Polyline precision used for route export (Google encoded polyline default).
pub const POLYLINE_PRECISION: u32 = 5;

/// A raw location sample as delivered by the location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters, if the provider reported one
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// Provider capture time (epoch millis)
    pub capture_time: i64,
}

impl LocationFix {
    /// True when the coordinates are finite and inside the valid lat/lon ranges.
    pub fn is_well_formed(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !self.accuracy.is_nan()
    }
}

/// One accepted point on a tracked route. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters; 0 when the fix carried no altitude
    pub altitude: f64,
    /// Acceptance time (epoch millis)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp: i64,
    /// Horizontal accuracy in meters
    pub accuracy: f64,
}

impl RoutePoint {
    /// Build a route point from a fix, stamped with the tracker's clock.
    pub fn from_fix(fix: &LocationFix, timestamp: i64) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: fix.altitude.unwrap_or(0.0),
            timestamp,
            accuracy: fix.accuracy,
        }
    }

    /// Geo coordinate (x = longitude, y = latitude).
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// Convert a route into a `geo` line string.
pub fn route_line(points: &[RoutePoint]) -> LineString<f64> {
    points.iter().map(RoutePoint::coord).collect()
}

/// Encode a route as a Google polyline.
pub fn encode_route(points: &[RoutePoint]) -> Result<String, RouteError> {
    polyline::encode_coordinates(points.iter().map(RoutePoint::coord), POLYLINE_PRECISION)
        .map_err(|e| RouteError::Polyline(e.to_string()))
}

/// Build a GeoJSON feature for a route with the given summary properties.
///
/// Routes with fewer than two points have no line geometry.
pub fn route_feature(points: &[RoutePoint], properties: JsonObject) -> Feature {
    let geometry = (points.len() >= 2)
        .then(|| Geometry::new(geojson::Value::from(&route_line(points))));

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Errors from route export.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to encode polyline: {0}")]
    Polyline(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, ts: i64) -> RoutePoint {
        RoutePoint {
            latitude: lat,
            longitude: lon,
            altitude: 0.0,
            timestamp: ts,
            accuracy: 5.0,
        }
    }

    #[test]
    fn test_from_fix_defaults_altitude_and_uses_given_timestamp() {
        let fix = LocationFix {
            latitude: 37.4,
            longitude: -122.1,
            altitude: None,
            accuracy: 8.0,
            capture_time: 10,
        };
        let p = RoutePoint::from_fix(&fix, 99);
        assert_eq!(p.altitude, 0.0);
        assert_eq!(p.timestamp, 99);
        assert_eq!(p.accuracy, 8.0);
    }

    #[test]
    fn test_malformed_fixes_detected() {
        let mut fix = LocationFix {
            latitude: 91.0,
            longitude: 0.0,
            altitude: None,
            accuracy: 5.0,
            capture_time: 0,
        };
        assert!(!fix.is_well_formed());
        fix.latitude = f64::NAN;
        assert!(!fix.is_well_formed());
        fix.latitude = 45.0;
        assert!(fix.is_well_formed());
    }

    #[test]
    fn test_encode_route_known_polyline() {
        // Reference example from the polyline algorithm documentation.
        let route = vec![
            point(38.5, -120.2, 0),
            point(40.7, -120.95, 1),
            point(43.252, -126.453, 2),
        ];
        let encoded = encode_route(&route).expect("encode");
        assert_eq!(encoded, "_p~iF~ps|U_ulLnnqC_mqNvxq`@");

        let decoded = polyline::decode_polyline(&encoded, POLYLINE_PRECISION).expect("decode");
        assert_eq!(decoded.0.len(), 3);
    }

    #[test]
    fn test_route_feature_requires_two_points() {
        let single = route_feature(&[point(1.0, 2.0, 0)], JsonObject::new());
        assert!(single.geometry.is_none());

        let line = route_feature(
            &[point(1.0, 2.0, 0), point(1.001, 2.0, 1_000)],
            JsonObject::new(),
        );
        assert!(matches!(
            line.geometry.map(|g| g.value),
            Some(geojson::Value::LineString(ref coords)) if coords.len() == 2
        ));
    }
}
