//! Aggregate statistics over persisted activities.
//!
//! Computed as a single fold so the store can answer every dashboard
//! query from one pass over its records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::CompletedActivity;
use crate::services::kinematics;

/// Statistics across all stored activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityStats {
    // ─── Totals ──────────────────────────────────────────────────
    pub total_activities: u32,
    pub total_distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_duration_sec: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_calories: u64,
    /// Pace over the summed distance and duration (min/km), 0 without distance
    pub average_pace: f64,

    // ─── Highlights ──────────────────────────────────────────────
    /// Activity with the greatest distance
    pub longest_activity: Option<ActivityHighlight>,
    /// Activity with the lowest positive average pace
    pub fastest_pace_activity: Option<ActivityHighlight>,

    // ─── By Activity Type ────────────────────────────────────────
    #[serde(default)]
    pub activities_by_type: HashMap<String, u32>,
    #[serde(default)]
    pub distance_by_type: HashMap<String, f64>,
}

/// Short reference to a notable activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct ActivityHighlight {
    pub id: String,
    pub activity_type: String,
    pub timestamp: DateTime<Utc>,
    pub distance_km: f64,
    pub average_pace: f64,
}

impl From<&CompletedActivity> for ActivityHighlight {
    fn from(activity: &CompletedActivity) -> Self {
        Self {
            id: activity.id.clone(),
            activity_type: activity.activity_type.to_string(),
            timestamp: activity.timestamp,
            distance_km: activity.distance_km,
            average_pace: activity.average_pace,
        }
    }
}

impl ActivityStats {
    /// Fold a set of activities into statistics.
    pub fn from_activities<'a>(activities: impl IntoIterator<Item = &'a CompletedActivity>) -> Self {
        let mut stats = Self::default();
        for activity in activities {
            stats.add(activity);
        }
        stats
    }

    /// Include one more activity.
    pub fn add(&mut self, activity: &CompletedActivity) {
        self.total_activities += 1;
        self.total_distance_km += activity.distance_km;
        self.total_duration_sec += activity.duration_sec;
        self.total_calories += u64::from(activity.calories);
        self.average_pace =
            kinematics::pace(self.total_distance_km, self.total_duration_sec as f64);

        let is_longer = self
            .longest_activity
            .as_ref()
            .is_none_or(|longest| activity.distance_km > longest.distance_km);
        if is_longer {
            self.longest_activity = Some(activity.into());
        }

        if activity.average_pace > 0.0 {
            let is_faster = self
                .fastest_pace_activity
                .as_ref()
                .is_none_or(|fastest| activity.average_pace < fastest.average_pace);
            if is_faster {
                self.fastest_pace_activity = Some(activity.into());
            }
        }

        let type_key = activity.activity_type.to_string();
        *self.activities_by_type.entry(type_key.clone()).or_insert(0) += 1;
        *self.distance_by_type.entry(type_key).or_insert(0.0) += activity.distance_km;
    }
}
