// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geodesic and kinematic calculations over GPS routes.
//!
//! Everything here is pure. Zero is the "not yet available" value for
//! pace, speed and calories; none of these functions return errors.

use crate::models::{ActivityType, RoutePoint};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fixes with a worse (larger) accuracy radius than this are noise.
pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 25.0;

/// Body weight used when the user's own weight is unknown.
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// Trailing window for the current pace.
pub const CURRENT_PACE_WINDOW_MS: i64 = 30_000;

/// MET for activity types without a speed table.
pub const UNKNOWN_ACTIVITY_MET: f64 = 6.0;

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Formatted pace when no pace is available yet.
pub const PACE_PLACEHOLDER: &str = "--:--/km";

// (upper speed bound in km/h, MET). The last band is open ended.
const RUNNING_MET_BANDS: &[(f64, f64)] = &[(8.0, 8.0), (10.0, 9.0), (12.0, 11.0), (f64::INFINITY, 12.5)];
const WALKING_MET_BANDS: &[(f64, f64)] = &[(4.0, 3.0), (5.5, 3.5), (f64::INFINITY, 4.5)];
const CYCLING_MET_BANDS: &[(f64, f64)] =
    &[(16.0, 6.0), (20.0, 8.0), (25.0, 10.0), (f64::INFINITY, 12.0)];

/// Great-circle distance between two coordinates in kilometers.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two route points in kilometers.
pub fn point_distance(from: &RoutePoint, to: &RoutePoint) -> f64 {
    distance(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Length of a route in kilometers.
pub fn total_distance(points: &[RoutePoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| point_distance(&pair[0], &pair[1]))
        .sum()
}

/// Pace in minutes per kilometer.
pub fn pace(distance_km: f64, duration_sec: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    (duration_sec / SECONDS_PER_MINUTE) / distance_km
}

/// Speed in kilometers per hour.
pub fn speed(distance_km: f64, duration_sec: f64) -> f64 {
    if duration_sec <= 0.0 {
        return 0.0;
    }
    distance_km * SECONDS_PER_HOUR / duration_sec
}

/// MET value for an activity at a given average speed.
///
/// Band upper bounds are exclusive: 8.0 km/h running is in the 9.0 band.
pub fn met_value(activity_type: &ActivityType, speed_kmh: f64) -> f64 {
    let bands = match activity_type {
        ActivityType::Running => RUNNING_MET_BANDS,
        ActivityType::Walking => WALKING_MET_BANDS,
        ActivityType::Cycling => CYCLING_MET_BANDS,
        ActivityType::Other(_) => return UNKNOWN_ACTIVITY_MET,
    };

    bands
        .iter()
        .find(|(upper, _)| speed_kmh < *upper)
        .or_else(|| bands.last())
        .map_or(UNKNOWN_ACTIVITY_MET, |(_, met)| *met)
}

/// Estimated energy expenditure in whole kilocalories.
pub fn calories(
    distance_km: f64,
    duration_sec: f64,
    activity_type: &ActivityType,
    weight_kg: f64,
) -> u32 {
    let met = met_value(activity_type, speed(distance_km, duration_sec));
    let kcal = met * weight_kg * (duration_sec / SECONDS_PER_HOUR);
    // Float-to-int casts truncate and saturate (negative and NaN become 0).
    kcal as u32
}

/// Total climb and descent in meters over consecutive points.
pub fn elevation(points: &[RoutePoint]) -> (f64, f64) {
    points
        .windows(2)
        .map(|pair| pair[1].altitude - pair[0].altitude)
        .fold((0.0, 0.0), |(gain, loss), delta| {
            if delta > 0.0 {
                (gain + delta, loss)
            } else {
                (gain, loss - delta)
            }
        })
}

/// Pace over the points captured within the trailing window ending at `now_ms`.
///
/// Needs at least two points inside the window; otherwise 0.
pub fn current_pace(points: &[RoutePoint], now_ms: i64, window_ms: i64) -> f64 {
    let start = points.partition_point(|p| now_ms - p.timestamp > window_ms);
    let recent = &points[start..];
    let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
        return 0.0;
    };
    if recent.len() < 2 {
        return 0.0;
    }

    let duration_sec = (last.timestamp - first.timestamp) as f64 / 1000.0;
    pace(total_distance(recent), duration_sec)
}

/// True when the accuracy radius lies in `[0, threshold]`.
pub fn is_accurate(accuracy_m: f64, threshold_m: f64) -> bool {
    (0.0..=threshold_m).contains(&accuracy_m)
}

// ─── Formatting ──────────────────────────────────────────────

/// "3.21 km"
pub fn format_distance(distance_km: f64) -> String {
    format!("{distance_km:.2} km")
}

/// "H:MM:SS" from one hour up, "M:SS" below.
pub fn format_duration(duration_sec: u64) -> String {
    let hours = duration_sec / 3600;
    let minutes = (duration_sec % 3600) / 60;
    let seconds = duration_sec % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// "5:30/km", or the placeholder when pace is zero or not finite.
pub fn format_pace(pace_min_per_km: f64) -> String {
    if !pace_min_per_km.is_finite() || pace_min_per_km <= 0.0 {
        return PACE_PLACEHOLDER.to_string();
    }
    let total_seconds = (pace_min_per_km * SECONDS_PER_MINUTE).round() as u64;
    format!("{}:{:02}/km", total_seconds / 60, total_seconds % 60)
}

/// "12.3 km/h"
pub fn format_speed(speed_kmh: f64) -> String {
    format!("{speed_kmh:.1} km/h")
}
