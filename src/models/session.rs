// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live session snapshot published to observers.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::activity::ActivityType;
use crate::models::route::RoutePoint;

/// Lifecycle phase of a tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Paused,
    Stopped,
}

/// Complete state of an in-progress or just-finished session.
///
/// Every publication is a fresh value; nothing mutates a snapshot after it
/// has been handed out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LiveSessionState {
    /// Publication counter, strictly increasing across sessions
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub revision: u64,
    pub phase: SessionPhase,
    pub is_tracking: bool,
    pub is_paused: bool,
    /// Cumulative distance (km)
    pub distance_km: f64,
    /// Active duration excluding pauses (seconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_sec: u64,
    /// Pace over the trailing window (min/km)
    pub current_pace: f64,
    /// Whole-session pace (min/km)
    pub average_pace: f64,
    /// km/h between the last two accepted points
    pub current_speed: f64,
    /// km/h over the whole session
    pub average_speed: f64,
    pub calories: u32,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    /// Accepted points in chronological order
    pub route: Vec<RoutePoint>,
    pub last_point: Option<RoutePoint>,
    #[cfg_attr(feature = "binding-generation", ts(as = "String"))]
    pub activity_type: ActivityType,
    pub target_distance_km: Option<f64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub target_duration_sec: Option<u64>,
    /// Session start (epoch millis)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub start_time: i64,
    /// Cumulative paused time (ms)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub paused_time_ms: i64,
    /// Set when the location subscription failed and ended the session
    pub interruption: Option<String>,
}

impl LiveSessionState {
    /// Fraction of the distance target covered, if a target is set.
    pub fn distance_progress(&self) -> Option<f64> {
        self.target_distance_km
            .filter(|target| *target > 0.0)
            .map(|target| self.distance_km / target)
    }

    /// Fraction of the duration target elapsed, if a target is set.
    pub fn duration_progress(&self) -> Option<f64> {
        self.target_duration_sec
            .filter(|target| *target > 0)
            .map(|target| self.duration_sec as f64 / target as f64)
    }

    /// True once any configured target has been met.
    pub fn target_reached(&self) -> bool {
        self.distance_progress().is_some_and(|p| p >= 1.0)
            || self.duration_progress().is_some_and(|p| p >= 1.0)
    }
}
