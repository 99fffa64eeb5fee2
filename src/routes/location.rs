// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location ingestion: the client's GPS provider posts fixes here.

use crate::error::{AppError, Result};
use crate::models::LocationFix;
use crate::services::{Delivery, LocationError};
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/location/fixes", post(post_fix))
        .route("/api/location/unavailable", post(post_unavailable))
}

#[derive(Debug, Deserialize, Validate)]
struct FixRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    longitude: f64,
    altitude: Option<f64>,
    /// Horizontal accuracy in meters
    #[validate(range(min = 0.0))]
    accuracy: f64,
    /// Capture time (ms since epoch); defaults to receipt time
    capture_time: Option<i64>,
}

#[derive(Serialize)]
struct FixResponse {
    delivery: Delivery,
}

/// Deliver one fix. An empty body reports a cycle without a usable fix.
async fn post_fix(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FixRequest>>,
) -> Result<(StatusCode, Json<FixResponse>)> {
    let fix = match body {
        Some(Json(request)) => {
            request.validate()?;
            Some(LocationFix {
                latitude: request.latitude,
                longitude: request.longitude,
                altitude: request.altitude,
                accuracy: request.accuracy,
                capture_time: request
                    .capture_time
                    .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            })
        }
        None => None,
    };

    let delivery = state.location.push(fix).map_err(not_listening)?;
    tracing::trace!(?delivery, "Fix received");
    Ok((StatusCode::ACCEPTED, Json(FixResponse { delivery })))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct UnavailableRequest {
    #[validate(length(max = 500))]
    reason: String,
    permission_denied: bool,
}

/// Report that the provider stopped delivering fixes.
async fn post_unavailable(
    State(state): State<Arc<AppState>>,
    body: Option<Json<UnavailableRequest>>,
) -> Result<StatusCode> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let error = if request.permission_denied {
        LocationError::PermissionDenied
    } else if request.reason.is_empty() {
        LocationError::Unavailable("provider stopped".to_string())
    } else {
        LocationError::Unavailable(request.reason)
    };

    tracing::warn!(error = %error, "Client reported location failure");
    state.location.fail(error).map_err(not_listening)?;
    Ok(StatusCode::ACCEPTED)
}

fn not_listening(err: LocationError) -> AppError {
    match err {
        LocationError::NotSubscribed => {
            AppError::Conflict("No tracking session is listening for fixes".to_string())
        }
        other => AppError::LocationUnavailable(other.to_string()),
    }
}
