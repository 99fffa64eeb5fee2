// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity types and the persisted activity record.

use chrono::{DateTime, Utc};
use geojson::{Feature, JsonObject};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

use crate::models::route::{encode_route, route_feature, RouteError, RoutePoint};
use crate::models::session::LiveSessionState;
use crate::services::kinematics;
use crate::time_utils::{format_utc_rfc3339, millis_to_utc};

/// Kind of exercise. Unknown names are kept verbatim and use a flat MET.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    #[default]
    Running,
    Walking,
    Cycling,
    Other(String),
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Cycling => "cycling",
            ActivityType::Other(name) => name,
        }
    }

    /// Human-readable label ("Running", "Hiking", ...).
    pub fn label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Activity".to_string(),
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "running" | "run" => ActivityType::Running,
            "walking" | "walk" => ActivityType::Walking,
            "cycling" | "ride" | "bike" => ActivityType::Cycling,
            _ => ActivityType::Other(normalized),
        })
    }
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(activity_type) => activity_type,
            Err(never) => match never {},
        }
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        value.as_str().to_string()
    }
}

/// A finished activity as handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompletedActivity {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Session start time
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(as = "String"))]
    pub activity_type: ActivityType,
    /// False for manually logged activities
    pub is_gps_tracked: bool,
    pub distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_sec: u64,
    /// min/km
    pub average_pace: f64,
    /// km/h
    pub average_speed: f64,
    pub calories: u32,
    pub route: Vec<RoutePoint>,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    #[serde(default)]
    pub notes: String,
    pub target_distance_km: Option<f64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub target_duration_sec: Option<u64>,
}

impl CompletedActivity {
    /// Build the persisted record from a session's terminal snapshot.
    pub fn from_session(state: &LiveSessionState, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: millis_to_utc(state.start_time),
            activity_type: state.activity_type.clone(),
            is_gps_tracked: true,
            distance_km: state.distance_km,
            duration_sec: state.duration_sec,
            average_pace: state.average_pace,
            average_speed: state.average_speed,
            calories: state.calories,
            route: state.route.clone(),
            elevation_gain_m: state.elevation_gain_m,
            elevation_loss_m: state.elevation_loss_m,
            notes: notes.into(),
            target_distance_km: state.target_distance_km,
            target_duration_sec: state.target_duration_sec,
        }
    }

    /// Build a manually logged (non-GPS) activity.
    pub fn manual(entry: ManualEntry, weight_kg: f64) -> Self {
        let duration = entry.duration_sec as f64;
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: entry.timestamp,
            average_pace: kinematics::pace(entry.distance_km, duration),
            average_speed: kinematics::speed(entry.distance_km, duration),
            calories: kinematics::calories(
                entry.distance_km,
                duration,
                &entry.activity_type,
                weight_kg,
            ),
            activity_type: entry.activity_type,
            is_gps_tracked: false,
            distance_km: entry.distance_km,
            duration_sec: entry.duration_sec,
            route: Vec::new(),
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            notes: entry.notes,
            target_distance_km: None,
            target_duration_sec: None,
        }
    }

    /// Encoded polyline of the route.
    pub fn encoded_route(&self) -> Result<String, RouteError> {
        encode_route(&self.route)
    }

    /// GeoJSON feature of the route carrying the activity summary.
    pub fn route_geojson(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), self.id.clone().into());
        properties.insert(
            "activity_type".to_string(),
            self.activity_type.as_str().into(),
        );
        properties.insert(
            "start_date".to_string(),
            format_utc_rfc3339(self.timestamp).into(),
        );
        properties.insert("distance_km".to_string(), self.distance_km.into());
        properties.insert("duration_sec".to_string(), self.duration_sec.into());
        properties.insert("elevation_gain_m".to_string(), self.elevation_gain_m.into());
        properties.insert("elevation_loss_m".to_string(), self.elevation_loss_m.into());
        route_feature(&self.route, properties)
    }
}

/// Input for a manually logged activity.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    pub distance_km: f64,
    pub duration_sec: u64,
    pub notes: String,
}
