// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily branch activity routes.

use crate::error::{AppError, Result};
use crate::models::{ActionOutcome, DailyActivityRecord, TileState};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/today", get(get_today))
        .route("/api/activities/history/{day}", get(get_day))
        .route("/api/activities/check-in", post(check_in))
        .route("/api/activities/huddle", post(huddle))
        .route("/api/activities/closure", post(closure))
}

#[derive(Serialize)]
pub struct TodayResponse {
    pub tiles: Vec<TileState>,
    pub record: DailyActivityRecord,
}

async fn get_today(State(state): State<Arc<AppState>>) -> Result<Json<TodayResponse>> {
    let presence = state.presence.lock().await;
    Ok(Json(TodayResponse {
        tiles: presence.today_tiles()?,
        record: presence.today_record()?,
    }))
}

/// Read a past day's record (`YYYY-MM-DD`).
async fn get_day(
    State(state): State<Arc<AppState>>,
    Path(day): Path<String>,
) -> Result<Json<DailyActivityRecord>> {
    let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid day: {}", day)))?;
    state
        .presence
        .lock()
        .await
        .record(day)?
        .map(Json)
        .ok_or_else(|| AppError::RecordNotFound(format!("No activity record for {}", day)))
}

async fn check_in(State(state): State<Arc<AppState>>) -> Result<Json<ActionOutcome>> {
    Ok(Json(state.presence.lock().await.perform_check_in()?))
}

async fn huddle(State(state): State<Arc<AppState>>) -> Result<Json<ActionOutcome>> {
    Ok(Json(state.presence.lock().await.perform_huddle()?))
}

async fn closure(State(state): State<Arc<AppState>>) -> Result<Json<ActionOutcome>> {
    Ok(Json(state.presence.lock().await.perform_closure()?))
}
