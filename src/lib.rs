// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stride-Tracker: live GPS run tracking
//!
//! This crate turns a stream of location fixes into live session metrics
//! (distance, pace, speed, calories, elevation), publishes snapshots to
//! observers and stores completed activities.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::ActivityDb;
use services::{PushLocationSource, TrackingService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: ActivityDb,
    pub tracking: TrackingService,
    /// Location provider fed by `POST /api/location/fixes`
    pub location: Arc<PushLocationSource>,
}
