// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests against the full router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _clock) = common::create_test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["subject_id"], "EMP001");
}

#[tokio::test]
async fn test_consent_flow_with_reported_fix() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app.clone().oneshot(get("/api/location")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["has_consent"], false);
    assert_eq!(body["is_tracking"], false);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/location/fix",
            json!({ "latitude": 40.7128, "longitude": -74.0060, "accuracy_meters": 8.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .clone()
        .oneshot(post_json("/api/location/consent", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["sample"]["resolved_place"], "Main Branch Office");
    assert_eq!(body["sample"]["origin"], "manual");

    let response = app.clone().oneshot(get("/api/location")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["has_consent"], true);
    assert_eq!(body["is_tracking"], true);

    let response = app
        .clone()
        .oneshot(post_json("/api/activities/check-in", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/location/consent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/location/history")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blocked_consent_is_reported_in_body() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/location/fix",
            json!({ "permission": "denied" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_json("/api/location/consent", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "blocked");
}

#[tokio::test]
async fn test_reported_denial_wins_over_fix_in_same_body() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/location/fix",
            json!({
                "latitude": 40.7128,
                "longitude": -74.0060,
                "accuracy_meters": 8.0,
                "permission": "denied"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_json("/api/location/consent", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "blocked");
}

#[tokio::test]
async fn test_invalid_fix_rejected() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/location/fix",
            json!({ "latitude": 91.0, "longitude": 0.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");

    let response = app
        .oneshot(post_json("/api/location/fix", json!({ "latitude": 40.0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_in_without_location_fails_softly() {
    let (app, _state, _clock) = common::create_test_app();
    let response = app
        .oneshot(post_json("/api/activities/check-in", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "not at branch");
    assert_eq!(body["reason"], "not-at-branch");
}

#[tokio::test]
async fn test_today_tiles() {
    let (app, _state, _clock) = common::create_test_app();
    let response = app.oneshot(get("/api/activities/today")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let tiles = body["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 3);
    assert_eq!(tiles[0]["id"], "branch-checkin");
    assert_eq!(tiles[0]["is_visible"], true);
    assert_eq!(tiles[0]["status"], "pending");
    assert_eq!(body["record"]["check_in"]["status"]["state"], "absent");
}

#[tokio::test]
async fn test_activity_history_lookup() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/activities/history/2026-03-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "record_not_found");

    let response = app
        .oneshot(get("/api/activities/history/yesterday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_meeting_lifecycle_over_http() {
    let (app, _state, clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/meetings",
            json!({
                "partner": { "kind": "new", "name": "Acme Brokers" },
                "scheduled_at": "2026-03-02T09:00:00",
                "purpose": "Goal Setting",
                "address": "12 Market Road"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let meeting = body_json(response).await;
    let id = meeting["meeting_id"].as_str().unwrap().to_string();
    let code = meeting["verification_code"].as_str().unwrap().to_string();
    assert_eq!(meeting["status"], "scheduled");

    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/meetings/{}/complete", id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "invalid_state");

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/meetings/{}/start", id),
            json!({ "code": code }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["meeting"]["status"], "in-progress");
    assert_eq!(body["meeting"]["check_in_timing"], "on-time");

    let response = app.clone().oneshot(get("/api/meetings/active")).await.unwrap();
    assert_eq!(body_json(response).await["meeting_id"], id.as_str());

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/meetings/{}/selfie", id),
            json!({ "image_base64": "/9j/4AAQSkZJRg==" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let selfie = body_json(response).await;
    assert!(selfie["reference"].as_str().unwrap().starts_with("selfie_"));

    clock.advance(chrono::Duration::minutes(20));
    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/meetings/{}/complete", id), json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["meeting"]["duration_minutes"], 20);

    let response = app
        .oneshot(get("/api/meetings?status=completed"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_meeting_validation_and_lookup() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/meetings",
            json!({
                "partner": { "kind": "existing", "agent_code": "PA001" },
                "scheduled_at": "2026-03-02T11:00:00",
                "address": ""
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json("/api/meetings/MTG_0_0/start", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "record_not_found");

    let response = app
        .oneshot(post_json(
            "/api/meetings/MTG_0_0/selfie",
            json!({ "image_base64": "not base64!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_partners() {
    let (app, _state, _clock) = common::create_test_app();
    let response = app.oneshot(get("/api/partners")).await.unwrap();
    let body = body_json(response).await;
    let partners = body.as_array().unwrap();
    assert_eq!(partners.len(), 3);
    assert_eq!(partners[0]["agent_code"], "PA001");
    assert_eq!(partners[0]["sub_category"], "IC");
}
