// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent status surface for a running session.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::LiveSessionState;
use crate::services::kinematics::{format_distance, format_duration, format_pace};

/// What the status surface shows. Derived only from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusNotification {
    pub title: String,
    pub body: String,
    pub is_paused: bool,
    pub distance: String,
    pub duration: String,
    pub pace: String,
    /// 0..=1 progress toward the distance or duration target, whichever is further
    pub target_progress: Option<f64>,
    pub target_reached: bool,
}

impl StatusNotification {
    pub fn from_state(state: &LiveSessionState) -> Self {
        let label = state.activity_type.label();
        let title = if state.is_paused {
            format!("{label} · Paused")
        } else {
            label
        };

        let distance = format_distance(state.distance_km);
        let duration = format_duration(state.duration_sec);
        let pace = format_pace(state.average_pace);
        let target_progress = match (state.distance_progress(), state.duration_progress()) {
            (Some(d), Some(t)) => Some(d.max(t)),
            (d, t) => d.or(t),
        }
        .map(|p| p.clamp(0.0, 1.0));

        Self {
            body: format!("{distance} • {duration} • {pace}"),
            title,
            is_paused: state.is_paused,
            distance,
            duration,
            pace,
            target_progress,
            target_reached: state.target_reached(),
        }
    }
}

/// Sink for the persistent status display.
pub trait StatusSurface: Send {
    /// Show or update the notification.
    fn show(&mut self, notification: &StatusNotification);

    /// Remove the notification (session over).
    fn clear(&mut self);
}

/// Status surface that writes to the log.
///
/// Repeated identical updates are suppressed and the target alert fires at
/// most once per session.
#[derive(Debug, Default)]
pub struct TracingStatusSurface {
    last: Option<StatusNotification>,
    target_alerted: bool,
}

impl TracingStatusSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSurface for TracingStatusSurface {
    fn show(&mut self, notification: &StatusNotification) {
        if self.last.as_ref() == Some(notification) {
            return;
        }

        tracing::debug!(
            title = %notification.title,
            body = %notification.body,
            "Status updated"
        );

        if notification.target_reached && !self.target_alerted {
            self.target_alerted = true;
            tracing::info!(title = %notification.title, "Session target reached");
        }

        self.last = Some(notification.clone());
    }

    fn clear(&mut self) {
        if self.last.take().is_some() {
            tracing::debug!("Status cleared");
        }
        self.target_alerted = false;
    }
}
