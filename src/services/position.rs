// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Position sources: the device's one-shot positioning capability.
//!
//! - [`ReportedPositionSource`] serves fixes pushed by the device over the API.
//! - [`MockPositionSource`] is a scripted source for tests and demos.

use crate::models::Coordinates;
use crate::time_utils::SharedClock;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// Device permission state, as far as it is known without prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    /// Not decided yet; acquiring will prompt the user.
    Prompt,
    Denied,
    Unsupported,
}

/// Classified acquisition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Timed out acquiring position")]
    Timeout,

    #[error("Geolocation is not supported on this device")]
    Unsupported,
}

/// Options for one acquisition.
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    pub timeout: Duration,
    /// Oldest cached fix the source may return.
    pub max_age: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_age: Duration::from_secs(600),
        }
    }
}

/// A raw fix from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

impl PositionFix {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// One-shot positioning capability.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Current permission state; never prompts.
    fn permission(&self) -> PermissionState;

    /// Acquire a single fix. Callers bound this with `options.timeout`.
    async fn acquire(&self, options: AcquireOptions) -> Result<PositionFix, AcquisitionError>;
}

// ─── Reported Source ─────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ReportedFix {
    fix: PositionFix,
    received_at: NaiveDateTime,
}

/// Position source fed by fixes the device pushes to the API.
///
/// `acquire` returns the latest fix if it is young enough, otherwise waits for
/// the next push.
#[derive(Clone)]
pub struct ReportedPositionSource {
    latest: Arc<watch::Sender<Option<ReportedFix>>>,
    permission: Arc<RwLock<PermissionState>>,
    clock: SharedClock,
}

impl ReportedPositionSource {
    pub fn new(clock: SharedClock) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            latest: Arc::new(tx),
            permission: Arc::new(RwLock::new(PermissionState::Prompt)),
            clock,
        }
    }

    /// Record a fix reported by the device. Reporting a fix implies the device
    /// has granted permission.
    pub fn report(&self, fix: PositionFix) {
        self.set_permission(PermissionState::Granted);
        let received_at = self.clock.now();
        self.latest.send_replace(Some(ReportedFix { fix, received_at }));
        tracing::debug!(
            latitude = fix.latitude,
            longitude = fix.longitude,
            accuracy = fix.accuracy_meters,
            "Position fix reported"
        );
    }

    pub fn set_permission(&self, state: PermissionState) {
        let mut guard = self.permission.write().unwrap_or_else(|e| e.into_inner());
        *guard = state;
    }

    fn is_fresh(&self, reported: &ReportedFix, max_age: Duration) -> bool {
        let age = self.clock.now() - reported.received_at;
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => age <= max_age,
            Err(_) => true,
        }
    }
}

#[async_trait]
impl PositionSource for ReportedPositionSource {
    fn permission(&self) -> PermissionState {
        *self.permission.read().unwrap_or_else(|e| e.into_inner())
    }

    async fn acquire(&self, options: AcquireOptions) -> Result<PositionFix, AcquisitionError> {
        match self.permission() {
            PermissionState::Denied => return Err(AcquisitionError::PermissionDenied),
            PermissionState::Unsupported => return Err(AcquisitionError::Unsupported),
            PermissionState::Granted | PermissionState::Prompt => {}
        }

        let mut rx = self.latest.subscribe();
        loop {
            let current = *rx.borrow_and_update();
            if let Some(reported) = current {
                if self.is_fresh(&reported, options.max_age) {
                    return Ok(reported.fix);
                }
            }
            if rx.changed().await.is_err() {
                return Err(AcquisitionError::PositionUnavailable);
            }
            if self.permission() == PermissionState::Denied {
                return Err(AcquisitionError::PermissionDenied);
            }
        }
    }
}

// ─── Mock Source ─────────────────────────────────────────────

/// Scripted position source.
///
/// Returns the configured fix, or the configured failure, immediately.
#[derive(Debug, Clone)]
pub struct MockPositionSource {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    permission: PermissionState,
    fix: Option<PositionFix>,
    failure: Option<AcquisitionError>,
    acquisitions: usize,
}

impl MockPositionSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                permission: PermissionState::Prompt,
                fix: None,
                failure: None,
                acquisitions: 0,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn set_permission(&self, permission: PermissionState) {
        self.with_state(|s| s.permission = permission);
    }

    /// Place the device at a position and clear any scripted failure.
    pub fn set_position(&self, position: Coordinates, accuracy_meters: f64) {
        self.with_state(|s| {
            s.fix = Some(PositionFix {
                latitude: position.latitude,
                longitude: position.longitude,
                accuracy_meters,
            });
            s.failure = None;
        });
    }

    /// Make every acquisition fail with `error` until a position is set.
    pub fn fail_with(&self, error: AcquisitionError) {
        self.with_state(|s| s.failure = Some(error));
    }

    /// Number of acquisitions attempted so far.
    pub fn acquisitions(&self) -> usize {
        self.with_state(|s| s.acquisitions)
    }
}

impl Default for MockPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PositionSource for MockPositionSource {
    fn permission(&self) -> PermissionState {
        self.with_state(|s| s.permission)
    }

    async fn acquire(&self, _options: AcquireOptions) -> Result<PositionFix, AcquisitionError> {
        self.with_state(|s| {
            s.acquisitions += 1;
            match s.permission {
                PermissionState::Denied => return Err(AcquisitionError::PermissionDenied),
                PermissionState::Unsupported => return Err(AcquisitionError::Unsupported),
                PermissionState::Granted | PermissionState::Prompt => {}
            }
            if let Some(err) = s.failure {
                return Err(err);
            }
            s.fix.ok_or(AcquisitionError::PositionUnavailable)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::ManualClock;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        ))
    }

    fn fix() -> PositionFix {
        PositionFix {
            latitude: 40.7128,
            longitude: -74.0060,
            accuracy_meters: 12.0,
        }
    }

    #[tokio::test]
    async fn test_reported_source_returns_fresh_fix() {
        let source = ReportedPositionSource::new(clock());
        source.report(fix());
        let got = source.acquire(AcquireOptions::default()).await.unwrap();
        assert_eq!(got, fix());
        assert_eq!(source.permission(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn test_reported_source_waits_past_stale_fix() {
        let clock = clock();
        let source = ReportedPositionSource::new(clock.clone());
        source.report(fix());
        clock.advance(chrono::Duration::minutes(11));

        let result =
            tokio::time::timeout(Duration::from_millis(50), source.acquire(AcquireOptions::default()))
                .await;
        assert!(result.is_err(), "stale fix should not be returned");
    }

    #[tokio::test]
    async fn test_reported_source_wakes_on_push() {
        let source = ReportedPositionSource::new(clock());
        let waiter = {
            let source = source.clone();
            tokio::spawn(async move { source.acquire(AcquireOptions::default()).await })
        };
        tokio::task::yield_now().await;
        source.report(fix());
        let got = waiter.await.unwrap().unwrap();
        assert_eq!(got, fix());
    }

    #[tokio::test]
    async fn test_reported_source_denied() {
        let source = ReportedPositionSource::new(clock());
        source.set_permission(PermissionState::Denied);
        let err = source.acquire(AcquireOptions::default()).await.unwrap_err();
        assert_eq!(err, AcquisitionError::PermissionDenied);
    }

    #[tokio::test]
    async fn test_mock_source_scripted_failure() {
        let source = MockPositionSource::new();
        source.set_position(fix().coordinates(), 5.0);
        source.fail_with(AcquisitionError::Timeout);
        let err = source.acquire(AcquireOptions::default()).await.unwrap_err();
        assert_eq!(err, AcquisitionError::Timeout);
        assert_eq!(source.acquisitions(), 1);
    }
}
