// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - tracking logic layer.

pub mod broadcast;
pub mod kinematics;
pub mod location;
pub mod orchestrator;
pub mod session;
pub mod status;
pub mod tracking;

pub use broadcast::{SessionSubscription, SnapshotFeed};
pub use location::{
    Delivery, LocationError, LocationRequest, LocationSource, LocationSubscription,
    PushLocationSource,
};
pub use orchestrator::{FixOutcome, LiveTracker, RejectReason, StartSession, TrackingConfig};
pub use session::SessionMachine;
pub use status::{StatusNotification, StatusSurface, TracingStatusSurface};
pub use tracking::{StopOutcome, StopSession, TrackerError, TrackingService};
