// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live tracking core.
//!
//! Turns accepted location fixes into session snapshots:
//! 1. Drop fixes while paused, malformed fixes and noisy fixes
//! 2. Append a route point stamped with the tracker clock
//! 3. Recompute every aggregate from the full route
//! 4. Replace the current snapshot with a new immutable one
//!
//! This type is synchronous and owns no I/O; `TrackingService` drives it.

use std::sync::Arc;

use crate::models::{ActivityType, LiveSessionState, LocationFix, RoutePoint, SessionPhase};
use crate::services::kinematics::{
    self, CURRENT_PACE_WINDOW_MS, DEFAULT_ACCURACY_THRESHOLD_M, DEFAULT_WEIGHT_KG,
};
use crate::services::session::SessionMachine;

/// Tunables for fix filtering and metric computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Max accepted horizontal accuracy (meters, inclusive)
    pub accuracy_threshold_m: f64,
    /// Body weight for the calorie model
    pub weight_kg: f64,
    /// Trailing window for current pace (ms)
    pub pace_window_ms: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
            weight_kg: DEFAULT_WEIGHT_KG,
            pace_window_ms: CURRENT_PACE_WINDOW_MS,
        }
    }
}

/// Parameters of a new session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartSession {
    pub activity_type: ActivityType,
    pub target_distance_km: Option<f64>,
    pub target_duration_sec: Option<u64>,
}

/// Why a fix was not added to the route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    NotTracking,
    Paused,
    Malformed,
    Inaccurate { accuracy: f64 },
    /// Captured before the previous accepted fix
    OutOfOrder,
}

/// Result of offering a fix to the tracker.
#[derive(Debug, Clone)]
pub enum FixOutcome {
    Accepted(Arc<LiveSessionState>),
    Rejected(RejectReason),
}

/// Errors from session commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("A tracking session is already in progress")]
    AlreadyTracking,
}

/// Owns the session state machine and the current snapshot.
#[derive(Debug)]
pub struct LiveTracker {
    config: TrackingConfig,
    machine: SessionMachine,
    state: Arc<LiveSessionState>,
    revision: u64,
    last_capture_time: Option<i64>,
}

impl LiveTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            machine: SessionMachine::new(),
            state: Arc::new(LiveSessionState::default()),
            revision: 0,
            last_capture_time: None,
        }
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> Arc<LiveSessionState> {
        Arc::clone(&self.state)
    }

    pub fn is_tracking(&self) -> bool {
        self.machine.is_tracking()
    }

    pub fn is_paused(&self) -> bool {
        self.machine.is_paused()
    }

    /// Start a fresh session, discarding the previous route.
    pub fn start(
        &mut self,
        session: StartSession,
        now: i64,
    ) -> Result<Arc<LiveSessionState>, SessionError> {
        if !self.machine.start(now) {
            return Err(SessionError::AlreadyTracking);
        }
        self.last_capture_time = None;

        let state = LiveSessionState {
            revision: self.next_revision(),
            phase: SessionPhase::Active,
            is_tracking: true,
            is_paused: false,
            activity_type: session.activity_type,
            target_distance_km: session.target_distance_km,
            target_duration_sec: session.target_duration_sec,
            start_time: self.machine.start_time(),
            ..Default::default()
        };
        Ok(self.publish(state))
    }

    /// Pause; `None` when the call was a no-op.
    pub fn pause(&mut self, now: i64) -> Option<Arc<LiveSessionState>> {
        if !self.machine.pause(now) {
            return None;
        }
        Some(self.refresh(now, None))
    }

    /// Resume; `None` when the call was a no-op.
    pub fn resume(&mut self, now: i64) -> Option<Arc<LiveSessionState>> {
        if !self.machine.resume(now) {
            return None;
        }
        Some(self.refresh(now, None))
    }

    /// Stop and return the terminal snapshot; `None` when not tracking.
    pub fn stop(&mut self, now: i64) -> Option<Arc<LiveSessionState>> {
        if !self.machine.stop(now) {
            return None;
        }
        Some(self.refresh(now, None))
    }

    /// End the session because the location subscription failed.
    pub fn interrupt(&mut self, reason: &str, now: i64) -> Option<Arc<LiveSessionState>> {
        if !self.machine.stop(now) {
            return None;
        }
        Some(self.refresh(now, Some(reason.to_string())))
    }

    /// Offer a raw fix to the session.
    pub fn process_fix(&mut self, fix: &LocationFix, now: i64) -> FixOutcome {
        if !self.machine.is_tracking() {
            return FixOutcome::Rejected(RejectReason::NotTracking);
        }
        if self.machine.is_paused() {
            return FixOutcome::Rejected(RejectReason::Paused);
        }
        if !fix.is_well_formed() {
            return FixOutcome::Rejected(RejectReason::Malformed);
        }
        if !kinematics::is_accurate(fix.accuracy, self.config.accuracy_threshold_m) {
            return FixOutcome::Rejected(RejectReason::Inaccurate {
                accuracy: fix.accuracy,
            });
        }
        if self
            .last_capture_time
            .is_some_and(|last| fix.capture_time < last)
        {
            return FixOutcome::Rejected(RejectReason::OutOfOrder);
        }

        // Batched fixes can be handled within one clock tick; route
        // timestamps stay strictly increasing.
        let stamp = match &self.state.last_point {
            Some(last) => now.max(last.timestamp + 1),
            None => now,
        };
        let point = RoutePoint::from_fix(fix, stamp);
        let since_last_update_ms = now - self.machine.last_update_time();
        let duration_sec = self.machine.elapsed_secs(now);

        let mut state = (*self.state).clone();
        let previous = state.last_point.replace(point.clone());
        state.route.push(point);

        let route = &state.route;
        let distance_km = kinematics::total_distance(route);
        let average_speed = kinematics::speed(distance_km, duration_sec as f64);
        let current_speed = match (previous, route.last()) {
            (Some(previous), Some(latest)) if since_last_update_ms > 0 => kinematics::speed(
                kinematics::point_distance(&previous, latest),
                since_last_update_ms as f64 / 1000.0,
            ),
            _ => average_speed,
        };
        let current_pace = kinematics::current_pace(route, now, self.config.pace_window_ms);
        let (elevation_gain_m, elevation_loss_m) = kinematics::elevation(route);

        state.revision = self.next_revision();
        state.distance_km = distance_km;
        state.duration_sec = duration_sec;
        state.current_pace = current_pace;
        state.average_pace = kinematics::pace(distance_km, duration_sec as f64);
        state.current_speed = current_speed;
        state.average_speed = average_speed;
        state.calories = kinematics::calories(
            distance_km,
            duration_sec as f64,
            &state.activity_type,
            self.config.weight_kg,
        );
        state.elevation_gain_m = elevation_gain_m;
        state.elevation_loss_m = elevation_loss_m;

        self.last_capture_time = Some(fix.capture_time);
        self.machine.mark_update(now);
        FixOutcome::Accepted(self.publish(state))
    }

    /// Republish after a lifecycle transition.
    ///
    /// Duration-derived totals are re-read from the machine (which freezes
    /// them while paused). Current pace and speed keep their last values.
    fn refresh(&mut self, now: i64, interruption: Option<String>) -> Arc<LiveSessionState> {
        let previous = Arc::clone(&self.state);
        let duration_sec = self.machine.elapsed_secs(now);
        let distance_km = previous.distance_km;

        let state = LiveSessionState {
            revision: self.next_revision(),
            phase: self.machine.phase(),
            is_tracking: self.machine.is_tracking(),
            is_paused: self.machine.is_paused(),
            duration_sec,
            average_pace: kinematics::pace(distance_km, duration_sec as f64),
            average_speed: kinematics::speed(distance_km, duration_sec as f64),
            calories: kinematics::calories(
                distance_km,
                duration_sec as f64,
                &previous.activity_type,
                self.config.weight_kg,
            ),
            paused_time_ms: self.machine.paused_time_ms(),
            interruption,
            ..(*previous).clone()
        };
        self.publish(state)
    }

    fn publish(&mut self, state: LiveSessionState) -> Arc<LiveSessionState> {
        self.state = Arc::new(state);
        Arc::clone(&self.state)
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64, accuracy: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: lon,
            altitude: None,
            accuracy,
            capture_time: 0,
        }
    }

    fn started(activity_type: ActivityType) -> LiveTracker {
        let mut tracker = LiveTracker::new(TrackingConfig::default());
        tracker
            .start(
                StartSession {
                    activity_type,
                    ..Default::default()
                },
                0,
            )
            .expect("start");
        tracker
    }

    fn accepted(outcome: FixOutcome) -> Arc<LiveSessionState> {
        match outcome {
            FixOutcome::Accepted(state) => state,
            FixOutcome::Rejected(reason) => panic!("fix rejected: {reason:?}"),
        }
    }

    #[test]
    fn test_fix_rejected_when_idle() {
        let mut tracker = LiveTracker::new(TrackingConfig::default());
        assert!(matches!(
            tracker.process_fix(&fix(0.0, 0.0, 5.0), 0),
            FixOutcome::Rejected(RejectReason::NotTracking)
        ));
    }

    #[test]
    fn test_first_fix_falls_back_to_average_speed() {
        let mut tracker = started(ActivityType::Running);
        let state = accepted(tracker.process_fix(&fix(0.0, 0.0, 5.0), 1_000));

        assert_eq!(state.route.len(), 1);
        assert_eq!(state.distance_km, 0.0);
        assert_eq!(state.duration_sec, 1);
        assert_eq!(state.current_speed, state.average_speed);
    }

    #[test]
    fn test_current_speed_uses_last_segment() {
        let mut tracker = started(ActivityType::Cycling);
        accepted(tracker.process_fix(&fix(0.0, 0.0, 5.0), 2_000));
        accepted(tracker.process_fix(&fix(0.0, 0.001, 5.0), 4_000));
        // Twice the distance in the same time as the previous segment.
        let state = accepted(tracker.process_fix(&fix(0.0, 0.003, 5.0), 6_000));

        let segment = kinematics::distance(0.0, 0.001, 0.0, 0.003);
        let expected = kinematics::speed(segment, 2.0);
        assert!((state.current_speed - expected).abs() < 1e-9);
        assert!(state.current_speed > state.average_speed);
    }

    #[test]
    fn test_fixes_in_same_tick_are_all_kept() {
        let mut tracker = started(ActivityType::Walking);
        accepted(tracker.process_fix(&fix(0.0, 0.0, 5.0), 1_000));
        accepted(tracker.process_fix(&fix(0.0, 0.001, 5.0), 1_000));
        let state = accepted(tracker.process_fix(&fix(0.0, 0.002, 5.0), 1_000));

        let stamps: Vec<i64> = state.route.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1_000, 1_001, 1_002]);
        assert!(state.distance_km > 0.2);
        assert!(state.current_speed.is_finite());
    }

    #[test]
    fn test_fix_captured_earlier_is_out_of_order() {
        let mut tracker = started(ActivityType::Walking);
        let mut late = fix(0.0, 0.0, 5.0);
        late.capture_time = 5_000;
        accepted(tracker.process_fix(&late, 1_000));

        let mut early = fix(0.0, 0.001, 5.0);
        early.capture_time = 4_000;
        assert!(matches!(
            tracker.process_fix(&early, 2_000),
            FixOutcome::Rejected(RejectReason::OutOfOrder)
        ));
        assert_eq!(tracker.snapshot().route.len(), 1);

        // A new session forgets the previous capture times.
        tracker.stop(3_000).expect("stop");
        tracker.start(StartSession::default(), 4_000).expect("restart");
        accepted(tracker.process_fix(&early, 5_000));
    }

    #[test]
    fn test_malformed_and_inaccurate_fixes_dropped() {
        let mut tracker = started(ActivityType::Walking);
        assert!(matches!(
            tracker.process_fix(&fix(f64::NAN, 0.0, 5.0), 1_000),
            FixOutcome::Rejected(RejectReason::Malformed)
        ));
        assert!(matches!(
            tracker.process_fix(&fix(0.0, 0.0, 30.0), 1_000),
            FixOutcome::Rejected(RejectReason::Inaccurate { .. })
        ));
        assert!(tracker.snapshot().route.is_empty());
    }

    #[test]
    fn test_pause_freezes_duration_and_drops_fixes() {
        let mut tracker = started(ActivityType::Running);
        accepted(tracker.process_fix(&fix(0.0, 0.0, 5.0), 4_000));

        let paused = tracker.pause(6_000).expect("pause");
        assert!(paused.is_paused);
        assert_eq!(paused.duration_sec, 6);
        assert!(matches!(
            tracker.process_fix(&fix(0.0, 0.001, 5.0), 8_000),
            FixOutcome::Rejected(RejectReason::Paused)
        ));
        assert!(tracker.pause(9_000).is_none());

        let resumed = tracker.resume(16_000).expect("resume");
        assert!(!resumed.is_paused);
        assert_eq!(resumed.duration_sec, 6);
        assert_eq!(resumed.paused_time_ms, 10_000);
    }

    #[test]
    fn test_revisions_strictly_increase_across_sessions() {
        let mut tracker = started(ActivityType::Running);
        let first = tracker.snapshot().revision;
        let stopped = tracker.stop(1_000).expect("stop");
        assert!(stopped.revision > first);
        assert_eq!(stopped.phase, SessionPhase::Stopped);
        assert!(!stopped.is_tracking);

        let restarted = tracker
            .start(StartSession::default(), 2_000)
            .expect("restart");
        assert!(restarted.revision > stopped.revision);
        assert!(restarted.route.is_empty());
        assert_eq!(restarted.start_time, 2_000);
    }

    #[test]
    fn test_start_twice_is_an_error() {
        let mut tracker = started(ActivityType::Running);
        assert_eq!(
            tracker.start(StartSession::default(), 10),
            Err(SessionError::AlreadyTracking)
        );
    }

    #[test]
    fn test_interrupt_records_reason() {
        let mut tracker = started(ActivityType::Running);
        let state = tracker.interrupt("permission revoked", 3_000).expect("interrupt");
        assert_eq!(state.phase, SessionPhase::Stopped);
        assert_eq!(state.interruption.as_deref(), Some("permission revoked"));
        assert!(tracker.interrupt("again", 4_000).is_none());
    }
}
