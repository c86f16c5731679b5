// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner meeting routes.

use crate::error::{AppError, Result};
use crate::models::meeting::SelfieRecord;
use crate::models::site::PartnerSummary;
use crate::models::{ActionOutcome, Meeting, MeetingStatus, NewMeeting};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", get(list_meetings).post(schedule_meeting))
        .route("/api/meetings/active", get(get_active))
        .route("/api/meetings/{id}", get(get_meeting))
        .route("/api/meetings/{id}/start", post(start_meeting))
        .route("/api/meetings/{id}/complete", post(complete_meeting))
        .route("/api/meetings/{id}/selfie", post(capture_selfie))
        .route("/api/partners", get(list_partners))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Filter by status instead of listing today's meetings.
    pub status: Option<MeetingStatus>,
}

async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Meeting>>> {
    let presence = state.presence.lock().await;
    let meetings = match params.status {
        Some(status) => presence.meetings_by_status(status)?,
        None => presence.meetings_today()?,
    };
    Ok(Json(meetings))
}

async fn schedule_meeting(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewMeeting>,
) -> Result<(StatusCode, Json<Meeting>)> {
    let meeting = state.presence.lock().await.schedule_meeting(request)?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn get_active(State(state): State<Arc<AppState>>) -> Result<Json<Option<Meeting>>> {
    Ok(Json(state.presence.lock().await.active_meeting()?))
}

async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Meeting>> {
    Ok(Json(state.presence.lock().await.meeting(&id)?))
}

/// Outcome of a lifecycle action with the meeting as it now stands.
#[derive(Debug, Serialize)]
pub struct MeetingActionResponse {
    #[serde(flatten)]
    pub outcome: ActionOutcome,
    pub meeting: Meeting,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Verification code for meetings without an anchor.
    #[serde(default)]
    pub code: Option<String>,
}

async fn start_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<Json<MeetingActionResponse>> {
    let mut presence = state.presence.lock().await;
    let outcome = presence.start_meeting(&id, request.code.as_deref())?;
    Ok(Json(MeetingActionResponse {
        outcome,
        meeting: presence.meeting(&id)?,
    }))
}

async fn complete_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MeetingActionResponse>> {
    let mut presence = state.presence.lock().await;
    let outcome = presence.complete_meeting(&id)?;
    Ok(Json(MeetingActionResponse {
        outcome,
        meeting: presence.meeting(&id)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelfieRequest {
    /// JPEG bytes, standard base64.
    pub image_base64: String,
}

async fn capture_selfie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SelfieRequest>,
) -> Result<Json<SelfieRecord>> {
    let image = BASE64
        .decode(request.image_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 image: {}", e)))?;
    Ok(Json(state.presence.lock().await.capture_selfie(&id, &image)?))
}

async fn list_partners(State(state): State<Arc<AppState>>) -> Json<Vec<PartnerSummary>> {
    Json(state.sites.partners().iter().map(PartnerSummary::from).collect())
}
