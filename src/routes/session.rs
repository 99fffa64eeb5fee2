// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live session command and read routes.

use crate::error::Result;
use crate::models::{ActivityType, CompletedActivity, LiveSessionState};
use crate::services::{StartSession, StatusNotification, StopSession};
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/status", get(get_status))
        .route("/api/session/stream", get(stream_session))
        .route("/api/session/start", post(start_session))
        .route("/api/session/pause", post(pause_session))
        .route("/api/session/resume", post(resume_session))
        .route("/api/session/stop", post(stop_session))
}

// ─── Reads ───────────────────────────────────────────────────

async fn get_session(State(state): State<Arc<AppState>>) -> Json<LiveSessionState> {
    Json((*state.tracking.current()).clone())
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusNotification> {
    Json(StatusNotification::from_state(&state.tracking.current()))
}

/// Server-sent events: the latest snapshot, then every later one.
async fn stream_session(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = state
        .tracking
        .subscribe()
        .into_stream()
        .filter_map(|snapshot| async move {
            match Event::default()
                .event("session")
                .id(snapshot.revision.to_string())
                .json_data(&*snapshot)
            {
                Ok(event) => Some(Ok::<_, Infallible>(event)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode session event");
                    None
                }
            }
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ─── Commands ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct StartRequest {
    activity_type: Option<String>,
    #[validate(range(min = 0.0))]
    target_distance_km: Option<f64>,
    #[validate(range(min = 1))]
    target_duration_sec: Option<u64>,
}

async fn start_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<LiveSessionState>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let activity_type = request
        .activity_type
        .map(ActivityType::from)
        .unwrap_or_default();

    let snapshot = state
        .tracking
        .start(StartSession {
            activity_type,
            target_distance_km: request.target_distance_km.filter(|d| *d > 0.0),
            target_duration_sec: request.target_duration_sec,
        })
        .await?;
    Ok(Json((*snapshot).clone()))
}

async fn pause_session(State(state): State<Arc<AppState>>) -> Result<Json<LiveSessionState>> {
    let snapshot = state.tracking.pause().await?;
    Ok(Json((*snapshot).clone()))
}

async fn resume_session(State(state): State<Arc<AppState>>) -> Result<Json<LiveSessionState>> {
    let snapshot = state.tracking.resume().await?;
    Ok(Json((*snapshot).clone()))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct StopRequest {
    save: bool,
    #[validate(length(max = 2000))]
    notes: String,
}

/// Stop response: the terminal snapshot and, when saved, the activity.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StopResponse {
    pub session: LiveSessionState,
    pub activity: Option<CompletedActivity>,
}

async fn stop_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StopRequest>>,
) -> Result<Json<StopResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let outcome = state
        .tracking
        .stop(StopSession {
            save: request.save,
            notes: request.notes,
        })
        .await?;

    Ok(Json(StopResponse {
        session: (*outcome.state).clone(),
        activity: outcome.activity,
    }))
}
