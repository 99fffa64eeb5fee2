// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geodesic and metric function tests.

use stride_tracker::models::ActivityType;
use stride_tracker::services::kinematics::{
    calories, distance, format_pace, met_value, pace, speed, PACE_PLACEHOLDER,
};

const POINTS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (37.4419, -122.143),
    (-33.8688, 151.2093),
    (51.5074, -0.1278),
    (89.9, 179.9),
];

#[test]
fn test_distance_is_symmetric() {
    for &(lat1, lon1) in &POINTS {
        for &(lat2, lon2) in &POINTS {
            let there = distance(lat1, lon1, lat2, lon2);
            let back = distance(lat2, lon2, lat1, lon1);
            assert!((there - back).abs() < 1e-9, "{there} != {back}");
        }
    }
}

#[test]
fn test_distance_to_self_is_zero() {
    for &(lat, lon) in &POINTS {
        assert_eq!(distance(lat, lon, lat, lon), 0.0);
    }
}

#[test]
fn test_known_distance_london_to_sydney() {
    let km = distance(51.5074, -0.1278, -33.8688, 151.2093);
    assert!((km - 16_994.0).abs() < 20.0, "got {km}");
}

#[test]
fn test_running_at_exactly_8_kmh_uses_upper_band() {
    // 2 km in 15 minutes
    let avg_speed = speed(2.0, 900.0);
    assert_eq!(avg_speed, 8.0);
    assert_eq!(met_value(&ActivityType::Running, avg_speed), 9.0);
    assert_eq!(met_value(&ActivityType::Running, 7.99), 8.0);

    // 9.0 MET * 70 kg * 0.25 h
    assert_eq!(calories(2.0, 900.0, &ActivityType::Running, 70.0), 157);
}

#[test]
fn test_unknown_activity_uses_flat_met() {
    let hiking: ActivityType = "hiking".parse().unwrap();
    assert_eq!(met_value(&hiking, 3.0), 6.0);
    assert_eq!(met_value(&hiking, 30.0), 6.0);
}

#[test]
fn test_zero_division_sentinels() {
    assert_eq!(pace(0.0, 100.0), 0.0);
    assert_eq!(speed(5.0, 0.0), 0.0);
    assert_eq!(format_pace(0.0), PACE_PLACEHOLDER);
    assert_eq!(format_pace(0.0), "--:--/km");
    assert_eq!(calories(0.0, 0.0, &ActivityType::Walking, 70.0), 0);
}
