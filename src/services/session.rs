// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle and active-time accounting.
//!
//! Idle -> Active <-> Paused -> Stopped. A stopped machine can be started
//! again; `start` resets every counter so nothing leaks between sessions.

use crate::models::SessionPhase;

/// Lifecycle state machine for one tracking session.
#[derive(Debug, Clone, Default)]
pub struct SessionMachine {
    phase: SessionPhase,
    /// Session start (epoch millis)
    start_time: i64,
    /// Completed pause intervals (ms)
    paused_time: i64,
    /// Start of the pause in progress, if any
    last_pause_timestamp: Option<i64>,
    /// Time of the last accepted fix (or of `start`)
    last_update_time: i64,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, SessionPhase::Active | SessionPhase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == SessionPhase::Paused
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn paused_time_ms(&self) -> i64 {
        self.paused_time
    }

    pub fn last_update_time(&self) -> i64 {
        self.last_update_time
    }

    /// Begin a new session. Returns false (no-op) if one is in progress.
    pub fn start(&mut self, now: i64) -> bool {
        if self.is_tracking() {
            return false;
        }
        *self = Self {
            phase: SessionPhase::Active,
            start_time: now,
            paused_time: 0,
            last_pause_timestamp: None,
            last_update_time: now,
        };
        true
    }

    /// Freeze accumulation. Only valid while active.
    pub fn pause(&mut self, now: i64) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.last_pause_timestamp = Some(now);
        self.phase = SessionPhase::Paused;
        true
    }

    /// Resume accumulation. Only valid while paused.
    pub fn resume(&mut self, now: i64) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.close_pause(now);
        self.phase = SessionPhase::Active;
        true
    }

    /// Terminate the session. Valid from active or paused.
    ///
    /// A pause in progress is folded into the paused total, so the active
    /// duration stays at its value from the moment of pausing.
    pub fn stop(&mut self, now: i64) -> bool {
        if !self.is_tracking() {
            return false;
        }
        self.close_pause(now);
        self.phase = SessionPhase::Stopped;
        true
    }

    /// Record the time of an accepted fix.
    pub fn mark_update(&mut self, now: i64) {
        self.last_update_time = now;
    }

    /// Active elapsed time in milliseconds, excluding pauses.
    ///
    /// While paused the clock is read at the pause timestamp, so the value
    /// cannot move until `resume`.
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        let effective_now = match (self.phase, self.last_pause_timestamp) {
            (SessionPhase::Paused, Some(paused_at)) => paused_at,
            _ => now,
        };
        (effective_now - self.start_time - self.paused_time).max(0)
    }

    /// Active elapsed time in whole seconds, floored at 0.
    pub fn elapsed_secs(&self, now: i64) -> u64 {
        (self.elapsed_ms(now) / 1000) as u64
    }

    fn close_pause(&mut self, now: i64) {
        if let Some(paused_at) = self.last_pause_timestamp.take() {
            self.paused_time += (now - paused_at).max(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_resets_counters() {
        let mut machine = SessionMachine::new();
        assert!(machine.start(1_000));
        assert!(machine.pause(2_000));
        assert!(machine.resume(5_000));
        assert!(machine.stop(6_000));
        assert_eq!(machine.paused_time_ms(), 3_000);

        assert!(machine.start(10_000));
        assert_eq!(machine.phase(), SessionPhase::Active);
        assert_eq!(machine.start_time(), 10_000);
        assert_eq!(machine.paused_time_ms(), 0);
        assert_eq!(machine.last_update_time(), 10_000);
    }

    #[test]
    fn test_start_while_tracking_is_rejected() {
        let mut machine = SessionMachine::new();
        assert!(machine.start(0));
        assert!(!machine.start(500));
        assert_eq!(machine.start_time(), 0);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut machine = SessionMachine::new();
        assert!(!machine.pause(0));
        assert!(!machine.resume(0));
        assert!(!machine.stop(0));

        machine.start(0);
        assert!(!machine.resume(100));
        assert!(machine.pause(100));
        assert!(!machine.pause(200));
        assert_eq!(machine.phase(), SessionPhase::Paused);
    }

    #[test]
    fn test_elapsed_excludes_pauses() {
        let mut machine = SessionMachine::new();
        machine.start(0);
        assert_eq!(machine.elapsed_secs(10_000), 10);

        machine.pause(10_000);
        assert_eq!(machine.elapsed_secs(20_000), 10);
        assert_eq!(machine.elapsed_secs(30_000), 10);

        machine.resume(30_000);
        assert_eq!(machine.paused_time_ms(), 20_000);
        assert_eq!(machine.elapsed_secs(35_000), 15);
    }

    #[test]
    fn test_stop_while_paused_keeps_frozen_duration() {
        let mut machine = SessionMachine::new();
        machine.start(0);
        machine.pause(4_000);
        machine.stop(9_000);
        assert_eq!(machine.elapsed_secs(9_000), 4);
        assert_eq!(machine.paused_time_ms(), 5_000);
    }

    #[test]
    fn test_elapsed_floors_at_zero() {
        let mut machine = SessionMachine::new();
        machine.start(5_000);
        assert_eq!(machine.elapsed_ms(1_000), 0);
    }
}
