// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stride-Tracker API Server
//!
//! Runs the live tracking service and exposes session commands, location
//! ingestion and the activity log over HTTP.

use std::sync::Arc;
use stride_tracker::{
    config::Config,
    db::ActivityDb,
    services::{PushLocationSource, TracingStatusSurface, TrackingService},
    time_utils::SystemClock,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Stride-Tracker API");

    // Open the activity store
    let db = match &config.activity_db_path {
        Some(path) => ActivityDb::open(path)
            .await
            .expect("Failed to open activity store"),
        None => {
            tracing::info!("ACTIVITY_DB_PATH not set; activities kept in memory");
            ActivityDb::new_in_memory()
        }
    };

    // Start the tracking service, fed by client-posted fixes
    let location = Arc::new(PushLocationSource::new());
    let tracking = TrackingService::spawn(
        Arc::clone(&location),
        Box::new(TracingStatusSurface::new()),
        db.clone(),
        Arc::new(SystemClock),
        config.tracking(),
        config.location_request(),
    );
    tracing::info!(
        accuracy_threshold_m = config.accuracy_threshold_m,
        weight_kg = config.weight_kg,
        "Tracking service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        tracking,
        location,
    });

    // Build router
    let app = stride_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stride_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
