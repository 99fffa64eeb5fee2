// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity log routes: history, manual entries, route export and stats.

use crate::db::ActivityFilter;
use crate::error::{AppError, Result};
use crate::models::route::POLYLINE_PRECISION;
use crate::models::{ActivityStats, ActivityType, CompletedActivity, ManualEntry};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_LIMIT: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/activities",
            get(list_activities).post(create_manual_activity),
        )
        .route(
            "/api/activities/{id}",
            get(get_activity).delete(delete_activity),
        )
        .route("/api/activities/{id}/route", get(get_activity_route))
        .route("/api/stats", get(get_stats))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Filter by activity type ("running", "walk", ...)
    activity_type: Option<String>,
    /// Only activities that started after this time (RFC3339)
    after: Option<String>,
    limit: Option<usize>,
}

fn parse_after_timestamp(after: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    after
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    AppError::BadRequest(
                        "Invalid 'after' parameter: must be RFC3339 datetime".to_string(),
                    )
                })
        })
        .transpose()
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
    pub total: u32,
}

/// Activity without its route.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: String,
    pub activity_type: String,
    pub start_date: String,
    pub is_gps_tracked: bool,
    pub distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_sec: u64,
    pub average_pace: f64,
    pub calories: u32,
    pub notes: String,
}

impl From<&CompletedActivity> for ActivitySummary {
    fn from(activity: &CompletedActivity) -> Self {
        Self {
            id: activity.id.clone(),
            activity_type: activity.activity_type.to_string(),
            start_date: format_utc_rfc3339(activity.timestamp),
            is_gps_tracked: activity.is_gps_tracked,
            distance_km: activity.distance_km,
            duration_sec: activity.duration_sec,
            average_pace: activity.average_pace,
            calories: activity.calories,
            notes: activity.notes.clone(),
        }
    }
}

/// List activities, newest first.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    tracing::debug!(
        activity_type = ?params.activity_type,
        after = ?params.after,
        limit = ?params.limit,
        "Fetching activities"
    );

    let filter = ActivityFilter {
        activity_type: params.activity_type.map(ActivityType::from),
        after: parse_after_timestamp(params.after.as_deref())?,
        limit: Some(params.limit.unwrap_or(DEFAULT_LIMIT)),
    };

    let activities: Vec<ActivitySummary> = state
        .db
        .list(&filter)
        .await?
        .iter()
        .map(ActivitySummary::from)
        .collect();

    Ok(Json(ActivitiesResponse {
        total: activities.len() as u32,
        activities,
    }))
}

// ─── Manual Entries ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct ManualActivityRequest {
    activity_type: String,
    /// Start time (RFC3339); defaults to now
    start_date: Option<String>,
    #[validate(range(min = 0.0))]
    distance_km: f64,
    #[validate(range(min = 1))]
    duration_sec: u64,
    #[serde(default)]
    #[validate(length(max = 2000))]
    notes: String,
}

/// Log an activity that was not GPS tracked.
async fn create_manual_activity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualActivityRequest>,
) -> Result<(StatusCode, Json<CompletedActivity>)> {
    request.validate()?;

    let timestamp = parse_after_timestamp(request.start_date.as_deref())
        .map_err(|_| {
            AppError::BadRequest("Invalid 'start_date': must be RFC3339 datetime".to_string())
        })?
        .unwrap_or_else(Utc::now);

    let activity = CompletedActivity::manual(
        ManualEntry {
            activity_type: ActivityType::from(request.activity_type),
            timestamp,
            distance_km: request.distance_km,
            duration_sec: request.duration_sec,
            notes: request.notes,
        },
        state.config.weight_kg,
    );
    state.db.save(&activity).await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

// ─── Single Activity ─────────────────────────────────────────

async fn load_activity(state: &AppState, id: &str) -> Result<CompletedActivity> {
    state
        .db
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {id} not found")))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompletedActivity>> {
    Ok(Json(load_activity(&state, &id).await?))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete(&id).await? {
        return Err(AppError::NotFound(format!("Activity {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RouteQuery {
    format: Option<String>,
}

/// Encoded polyline response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PolylineResponse {
    pub id: String,
    pub polyline: String,
    pub precision: u32,
    pub points: usize,
}

/// Export the route as GeoJSON (default) or an encoded polyline.
async fn get_activity_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RouteQuery>,
) -> Result<Response> {
    let activity = load_activity(&state, &id).await?;

    match query.format.as_deref().unwrap_or("geojson") {
        "geojson" => Ok(Json(activity.route_geojson()).into_response()),
        "polyline" => {
            let polyline = activity
                .encoded_route()
                .map_err(|e| AppError::Internal(e.into()))?;
            Ok(Json(PolylineResponse {
                id: activity.id,
                polyline,
                precision: POLYLINE_PRECISION,
                points: activity.route.len(),
            })
            .into_response())
        }
        other => Err(AppError::BadRequest(format!(
            "Unknown route format '{other}': use 'geojson' or 'polyline'"
        ))),
    }
}

// ─── Statistics ──────────────────────────────────────────────

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<ActivityStats>> {
    Ok(Json(state.db.stats().await?))
}
