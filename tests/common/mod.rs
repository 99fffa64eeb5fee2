// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::{Arc, Mutex};
use stride_tracker::config::Config;
use stride_tracker::db::ActivityDb;
use stride_tracker::models::{LiveSessionState, LocationFix};
use stride_tracker::routes::create_router;
use stride_tracker::services::{
    Delivery, LocationRequest, PushLocationSource, StatusNotification, StatusSurface,
    TrackingConfig, TrackingService,
};
use stride_tracker::time_utils::ManualClock;
use stride_tracker::AppState;

/// Session start time used by the tracking tests.
#[allow(dead_code)]
pub const T0: i64 = 1_700_000_000_000;

/// What the tracking service did to the status surface.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Show(StatusNotification),
    Clear,
}

/// Status surface that records every call.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct RecordingStatusSurface {
    pub events: Arc<Mutex<Vec<StatusEvent>>>,
}

impl StatusSurface for RecordingStatusSurface {
    fn show(&mut self, notification: &StatusNotification) {
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::Show(notification.clone()));
    }

    fn clear(&mut self) {
        self.events.lock().unwrap().push(StatusEvent::Clear);
    }
}

/// Build a fix with the given accuracy.
#[allow(dead_code)]
pub fn fix(latitude: f64, longitude: f64, accuracy: f64, capture_time: i64) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        altitude: None,
        accuracy,
        capture_time,
    }
}

/// A tracking service driven by a manual clock and a push source.
#[allow(dead_code)]
pub struct TrackingHarness {
    pub service: TrackingService,
    pub source: Arc<PushLocationSource>,
    pub clock: Arc<ManualClock>,
    pub db: ActivityDb,
    pub status: RecordingStatusSurface,
}

#[allow(dead_code)]
impl TrackingHarness {
    pub fn new() -> Self {
        Self::with_config(TrackingConfig::default())
    }

    pub fn with_config(config: TrackingConfig) -> Self {
        let source = Arc::new(PushLocationSource::new());
        let clock = Arc::new(ManualClock::new(T0));
        let db = ActivityDb::new_in_memory();
        let status = RecordingStatusSurface::default();

        let service = TrackingService::spawn(
            Arc::clone(&source),
            Box::new(status.clone()),
            db.clone(),
            clock.clone(),
            config,
            LocationRequest {
                wait_for_accurate_location: false,
                ..Default::default()
            },
        );

        Self {
            service,
            source,
            clock,
            db,
            status,
        }
    }

    /// Deliver a fix captured at `at_ms` and wait until it is handled.
    pub async fn fix_at(
        &self,
        at_ms: i64,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
    ) -> Arc<LiveSessionState> {
        self.clock.set(at_ms);
        let delivery = self
            .source
            .push(Some(fix(latitude, longitude, accuracy, at_ms)))
            .unwrap();
        assert_eq!(delivery, Delivery::Delivered);
        self.service.settled().await.unwrap()
    }

    pub fn status_events(&self) -> Vec<StatusEvent> {
        self.status.events.lock().unwrap().clone()
    }
}

/// Create a test app with an in-memory store and a push location source.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config {
        location_wait_for_accurate: false,
        ..Config::default()
    };
    let db = ActivityDb::new_in_memory();
    let location = Arc::new(PushLocationSource::new());

    let tracking = TrackingService::spawn(
        Arc::clone(&location),
        Box::new(RecordingStatusSurface::default()),
        db.clone(),
        Arc::new(stride_tracker::time_utils::SystemClock),
        config.tracking(),
        config.location_request(),
    );

    let state = Arc::new(AppState {
        config,
        db,
        tracking,
        location,
    });

    (create_router(state.clone()), state)
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
