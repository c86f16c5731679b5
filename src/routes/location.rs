// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location routes: consent, captures, history and device fix ingest.

use crate::error::{AppError, Result};
use crate::models::{Coordinates, LocationSample};
use crate::services::position::{AcquisitionError, PermissionState, PositionFix};
use crate::services::tracker::{CaptureError, ConsentError, TrackingStatus};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/location", get(get_status))
        .route(
            "/api/location/consent",
            post(request_consent).delete(revoke_consent),
        )
        .route("/api/location/capture", post(capture_now))
        .route("/api/location/history", get(get_history))
        .route("/api/location/fix", post(report_fix))
}

/// Result of an action that may produce a sample.
#[derive(Debug, Serialize)]
pub struct SampleResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<LocationSample>,
}

impl SampleResponse {
    fn captured(message: &str, sample: LocationSample) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            reason: None,
            sample: Some(sample),
        }
    }

    fn failed(message: String, reason: &'static str) -> Self {
        Self {
            success: false,
            message,
            reason: Some(reason),
            sample: None,
        }
    }
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<TrackingStatus> {
    Json(state.presence.lock().await.location_status())
}

/// Ask for location permission. Denials are reported in the body, not as
/// HTTP errors.
async fn request_consent(State(state): State<Arc<AppState>>) -> Result<Json<SampleResponse>> {
    let mut presence = state.presence.lock().await;
    match presence.request_consent().await {
        Ok(sample) => Ok(Json(SampleResponse::captured(
            "Location consent granted",
            sample,
        ))),
        Err(ConsentError::Store(err)) => Err(err.into()),
        Err(err) => Ok(Json(SampleResponse::failed(err.to_string(), err.reason()))),
    }
}

async fn revoke_consent(State(state): State<Arc<AppState>>) -> Result<Json<SampleResponse>> {
    state.presence.lock().await.revoke_consent()?;
    Ok(Json(SampleResponse {
        success: true,
        message: "Location consent revoked".to_string(),
        reason: None,
        sample: None,
    }))
}

async fn capture_now(State(state): State<Arc<AppState>>) -> Result<Json<SampleResponse>> {
    let mut presence = state.presence.lock().await;
    match presence.capture_now().await {
        Ok(sample) => Ok(Json(SampleResponse::captured("Location captured", sample))),
        Err(CaptureError::Store(err)) => Err(err.into()),
        Err(CaptureError::Acquisition(err)) => {
            let reason = match err {
                AcquisitionError::PermissionDenied => "permission-denied",
                AcquisitionError::PositionUnavailable => "position-unavailable",
                AcquisitionError::Timeout => "timeout",
                AcquisitionError::Unsupported => "unsupported",
            };
            Ok(Json(SampleResponse::failed(err.to_string(), reason)))
        }
    }
}

async fn get_history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LocationSample>>> {
    Ok(Json(state.presence.lock().await.history()?))
}

/// A fix or permission change pushed by the device.
#[derive(Debug, Deserialize)]
pub struct FixReport {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy_meters: f64,
    pub permission: Option<PermissionState>,
}

/// Feed the reported position source. Does not take the engine lock.
///
/// A fix implies the permission is granted; an explicit `permission` in the
/// same body is applied after it and wins.
async fn report_fix(
    State(state): State<Arc<AppState>>,
    Json(report): Json<FixReport>,
) -> Result<StatusCode> {
    match (report.latitude, report.longitude) {
        (Some(latitude), Some(longitude)) => {
            let coordinates = Coordinates::new(latitude, longitude);
            coordinates
                .validate()
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if report.accuracy_meters < 0.0 {
                return Err(AppError::BadRequest(
                    "accuracy_meters must not be negative".to_string(),
                ));
            }
            state.position.report(PositionFix {
                latitude,
                longitude,
                accuracy_meters: report.accuracy_meters,
            });
        }
        (None, None) if report.permission.is_some() => {}
        _ => {
            return Err(AppError::BadRequest(
                "Expected latitude and longitude, or a permission state".to_string(),
            ))
        }
    }

    if let Some(permission) = report.permission {
        state.position.set_permission(permission);
        tracing::info!(?permission, "Device permission reported");
    }
    Ok(StatusCode::ACCEPTED)
}
