// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP tests for session commands and location ingestion.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn post(app: &Router, uri: &str, body: Option<Value>) -> axum::response::Response {
    let builder = Request::builder().method("POST").uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = common::create_test_app();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = common::body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_idle_session_snapshot() {
    let (app, _state) = common::create_test_app();
    let json = common::body_json(get(&app, "/api/session").await).await;

    assert_eq!(json["phase"], "idle");
    assert_eq!(json["is_tracking"], false);
    assert_eq!(json["route"], json!([]));
}

#[tokio::test]
async fn test_session_lifecycle_over_http() {
    let (app, state) = common::create_test_app();

    let response = post(
        &app,
        "/api/session/start",
        Some(json!({ "activity_type": "walk", "target_distance_km": 5.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let started = common::body_json(response).await;
    assert_eq!(started["activity_type"], "walking");
    assert_eq!(started["is_tracking"], true);
    assert!(state.location.is_subscribed());

    // Second start conflicts.
    let response = post(&app, "/api/session/start", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(common::body_json(response).await["error"], "conflict");

    let response = post(
        &app,
        "/api/location/fixes",
        Some(json!({ "latitude": 37.0, "longitude": -122.0, "accuracy": 8.0, "capture_time": 1000 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(common::body_json(response).await["delivery"], "delivered");

    // Pause is queued behind the fix.
    let paused = common::body_json(post(&app, "/api/session/pause", None).await).await;
    assert_eq!(paused["phase"], "paused");
    assert_eq!(paused["route"].as_array().unwrap().len(), 1);

    let status = common::body_json(get(&app, "/api/session/status").await).await;
    assert_eq!(status["title"], "Walking · Paused");

    let resumed = common::body_json(post(&app, "/api/session/resume", None).await).await;
    assert_eq!(resumed["phase"], "active");

    let response = post(
        &app,
        "/api/session/stop",
        Some(json!({ "save": true, "notes": "evening loop" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stopped = common::body_json(response).await;
    assert_eq!(stopped["session"]["phase"], "stopped");
    assert_eq!(stopped["activity"]["notes"], "evening loop");
    assert_eq!(state.db.len(), 1);

    // Nobody is listening any more.
    let response = post(
        &app,
        "/api/location/fixes",
        Some(json!({ "latitude": 37.0, "longitude": -122.0, "accuracy": 8.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_fix_validation() {
    let (app, _state) = common::create_test_app();
    post(&app, "/api/session/start", None).await;

    let response = post(
        &app,
        "/api/location/fixes",
        Some(json!({ "latitude": 91.0, "longitude": 0.0, "accuracy": 5.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(
        &app,
        "/api/location/fixes",
        Some(json!({ "latitude": 0.0, "longitude": 0.0, "accuracy": -1.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty body: a cycle without a usable fix.
    let response = post(&app, "/api/location/fixes", None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_negative_target_rejected() {
    let (app, _state) = common::create_test_app();
    let response = post(
        &app,
        "/api/session/start",
        Some(json!({ "target_distance_km": -1.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_location_failure_reported_to_next_command() {
    let (app, _state) = common::create_test_app();
    post(&app, "/api/session/start", None).await;

    let response = post(
        &app,
        "/api/location/unavailable",
        Some(json!({ "reason": "GPS disabled" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = post(&app, "/api/session/pause", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = common::body_json(response).await;
    assert_eq!(json["error"], "tracking_interrupted");
    assert!(json["details"].as_str().unwrap().contains("GPS disabled"));
}

#[tokio::test]
async fn test_stream_starts_with_latest_snapshot() {
    let (app, _state) = common::create_test_app();
    post(&app, "/api/session/start", None).await;

    let response = get(&app, "/api/session/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = body.next().await.unwrap().unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.contains("event: session"));
    assert!(text.contains("\"is_tracking\":true"));
}
