// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location fix sources.
//!
//! A source hands out a `LocationSubscription` once fixes can flow. Each
//! item is `Ok(Some(fix))`, `Ok(None)` for a cycle without a usable fix, or
//! `Err` when the provider failed. The stream ending also means failure.
//! Dropping the subscription cancels it.

use serde::Serialize;
use std::future::{self, Future};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};

use crate::models::LocationFix;
use crate::services::kinematics::{self, DEFAULT_ACCURACY_THRESHOLD_M};

/// Default number of fixes queued between provider and tracker.
pub const DEFAULT_FIX_BUFFER: usize = 64;

/// How often and how precisely fixes should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRequest {
    /// Target interval between fixes (ms)
    pub interval_ms: u64,
    /// Fixes closer together than this are dropped (ms)
    pub fastest_interval_ms: u64,
    /// Longest the provider may batch fixes (ms)
    pub max_update_delay_ms: u64,
    pub high_accuracy: bool,
    /// Hold back delivery until a fix meets the accuracy threshold
    pub wait_for_accurate_location: bool,
    pub accuracy_threshold_m: f64,
    /// Queue capacity between provider and tracker
    pub buffer: usize,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            fastest_interval_ms: 1000,
            max_update_delay_ms: 5000,
            high_accuracy: true,
            wait_for_accurate_location: true,
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
            buffer: DEFAULT_FIX_BUFFER,
        }
    }
}

/// One delivery from a location subscription.
pub type LocationUpdate = Result<Option<LocationFix>, LocationError>;

/// Errors from location providers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("No active location subscription")]
    NotSubscribed,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location provider unavailable: {0}")]
    Unavailable(String),
}

/// An active stream of location updates.
#[derive(Debug)]
pub struct LocationSubscription {
    receiver: mpsc::Receiver<LocationUpdate>,
}

impl LocationSubscription {
    pub fn new(receiver: mpsc::Receiver<LocationUpdate>) -> Self {
        Self { receiver }
    }

    /// Next update; `None` when the provider has gone away.
    pub async fn recv(&mut self) -> Option<LocationUpdate> {
        self.receiver.recv().await
    }

    /// Take an update that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Result<LocationUpdate, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Number of updates waiting to be received.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

/// Something that can deliver location fixes.
pub trait LocationSource: Send + Sync + 'static {
    /// Resolve once the subscription is live.
    fn subscribe(
        &self,
        request: &LocationRequest,
    ) -> impl Future<Output = Result<LocationSubscription, LocationError>> + Send;
}

/// What happened to a pushed fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Delivered,
    /// Dropped: arrived sooner than the fastest interval
    Throttled,
    /// Dropped: still waiting for the first accurate fix
    AwaitingAccurateFix,
    /// Dropped: the tracker is not keeping up
    QueueFull,
}

/// Location source fed by the client (e.g. the phone posting fixes).
#[derive(Debug, Default)]
pub struct PushLocationSource {
    inner: Mutex<PushState>,
}

#[derive(Debug, Default)]
struct PushState {
    sender: Option<mpsc::Sender<LocationUpdate>>,
    request: LocationRequest,
    awaiting_accurate: bool,
    last_delivered_capture: Option<i64>,
}

impl PushLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a tracker is listening.
    pub fn is_subscribed(&self) -> bool {
        let state = self.lock();
        state.sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Deliver a fix (or a missing-fix cycle) to the subscriber.
    pub fn push(&self, fix: Option<LocationFix>) -> Result<Delivery, LocationError> {
        let mut state = self.lock();
        let sender = state.live_sender()?;

        if let Some(fix) = &fix {
            if state.awaiting_accurate {
                if !kinematics::is_accurate(fix.accuracy, state.request.accuracy_threshold_m) {
                    return Ok(Delivery::AwaitingAccurateFix);
                }
                state.awaiting_accurate = false;
            }

            let min_spacing = state.request.fastest_interval_ms as i64;
            if state
                .last_delivered_capture
                .is_some_and(|last| fix.capture_time - last < min_spacing)
            {
                return Ok(Delivery::Throttled);
            }
        }

        let capture_time = fix.as_ref().map(|f| f.capture_time);
        match sender.try_send(Ok(fix)) {
            Ok(()) => {
                if capture_time.is_some() {
                    state.last_delivered_capture = capture_time;
                }
                Ok(Delivery::Delivered)
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Location queue full; dropping fix");
                Ok(Delivery::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                state.sender = None;
                Err(LocationError::NotSubscribed)
            }
        }
    }

    /// Report that the provider can no longer deliver fixes.
    ///
    /// The subscriber receives the error and the subscription ends.
    pub fn fail(&self, error: LocationError) -> Result<(), LocationError> {
        let mut state = self.lock();
        let sender = state.live_sender()?;
        state.sender = None;
        // Await-free send: a full queue still closes the channel below.
        let _ = sender.try_send(Err(error));
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PushState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, request: &LocationRequest) -> LocationSubscription {
        let (sender, receiver) = mpsc::channel(request.buffer.max(1));
        let mut state = self.lock();
        if state.sender.replace(sender).is_some() {
            tracing::debug!("Replacing previous location subscription");
        }
        state.request = request.clone();
        state.awaiting_accurate = request.wait_for_accurate_location;
        state.last_delivered_capture = None;

        tracing::info!(
            interval_ms = request.interval_ms,
            fastest_interval_ms = request.fastest_interval_ms,
            max_update_delay_ms = request.max_update_delay_ms,
            high_accuracy = request.high_accuracy,
            "Location subscription active"
        );
        LocationSubscription::new(receiver)
    }
}

impl PushState {
    fn live_sender(&mut self) -> Result<mpsc::Sender<LocationUpdate>, LocationError> {
        match &self.sender {
            Some(sender) if !sender.is_closed() => Ok(sender.clone()),
            _ => {
                self.sender = None;
                Err(LocationError::NotSubscribed)
            }
        }
    }
}

impl LocationSource for PushLocationSource {
    fn subscribe(
        &self,
        request: &LocationRequest,
    ) -> impl Future<Output = Result<LocationSubscription, LocationError>> + Send {
        future::ready(Ok(self.open(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(accuracy: f64, capture_time: i64) -> LocationFix {
        LocationFix {
            latitude: 10.0,
            longitude: 20.0,
            altitude: None,
            accuracy,
            capture_time,
        }
    }

    fn request(wait_for_accurate_location: bool) -> LocationRequest {
        LocationRequest {
            wait_for_accurate_location,
            ..Default::default()
        }
    }

    #[test]
    fn test_push_without_subscriber() {
        let source = PushLocationSource::new();
        assert!(!source.is_subscribed());
        assert_eq!(source.push(Some(fix(5.0, 0))), Err(LocationError::NotSubscribed));
    }

    #[tokio::test]
    async fn test_waits_for_first_accurate_fix() {
        let source = PushLocationSource::new();
        let mut subscription = source.subscribe(&request(true)).await.unwrap();

        assert_eq!(source.push(Some(fix(80.0, 0))), Ok(Delivery::AwaitingAccurateFix));
        assert_eq!(source.push(Some(fix(10.0, 2_000))), Ok(Delivery::Delivered));
        // Once started, inaccurate fixes pass through; the tracker filters them.
        assert_eq!(source.push(Some(fix(80.0, 4_000))), Ok(Delivery::Delivered));

        let first = subscription.recv().await.unwrap().unwrap().unwrap();
        assert_eq!(first.capture_time, 2_000);
    }

    #[tokio::test]
    async fn test_fastest_interval_throttles() {
        let source = PushLocationSource::new();
        let _subscription = source.subscribe(&request(false)).await.unwrap();

        assert_eq!(source.push(Some(fix(5.0, 0))), Ok(Delivery::Delivered));
        assert_eq!(source.push(Some(fix(5.0, 500))), Ok(Delivery::Throttled));
        assert_eq!(source.push(Some(fix(5.0, 1_000))), Ok(Delivery::Delivered));
        // Missing-fix cycles are forwarded and do not affect spacing.
        assert_eq!(source.push(None), Ok(Delivery::Delivered));
        assert_eq!(source.push(Some(fix(5.0, 1_500))), Ok(Delivery::Throttled));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let source = PushLocationSource::new();
        let subscription = source.subscribe(&request(false)).await.unwrap();
        assert!(source.is_subscribed());

        drop(subscription);
        assert!(!source.is_subscribed());
        assert_eq!(source.push(Some(fix(5.0, 0))), Err(LocationError::NotSubscribed));
    }

    #[tokio::test]
    async fn test_fail_ends_subscription() {
        let source = PushLocationSource::new();
        let mut subscription = source.subscribe(&request(false)).await.unwrap();

        source.fail(LocationError::PermissionDenied).unwrap();
        assert_eq!(
            subscription.recv().await,
            Some(Err(LocationError::PermissionDenied))
        );
        assert!(subscription.recv().await.is_none());
        assert!(!source.is_subscribed());
    }
}
