// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location tracking: consent lifecycle, sampling, current-sample cache, and history.
//!
//! The tracker is the only writer of the current sample. Consumers read it
//! through a [`PositionSnapshot`].

use crate::db::{PresenceDb, StoreError};
use crate::models::{ConsentRecord, Coordinates, LocationSample, SampleOrigin};
use crate::services::geofence;
use crate::services::position::{
    AcquireOptions, AcquisitionError, PermissionState, PositionFix, PositionSource,
};
use crate::services::sites::{SiteDirectory, UNRESOLVED_PLACE};
use crate::time_utils::SharedClock;
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::sync::Arc;

/// Tunables for tracking.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub cadence: chrono::Duration,
    /// First hour of the working window.
    pub window_start_hour: u32,
    /// Last hour of the working window; the whole hour is included.
    pub window_end_hour: u32,
    pub acquire: AcquireOptions,
    pub history_cap: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            cadence: chrono::Duration::minutes(60),
            window_start_hour: 9,
            window_end_hour: 21,
            acquire: AcquireOptions::default(),
            history_cap: 100,
        }
    }
}

/// Why a consent request failed.
#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("Geolocation is not supported on this device")]
    Unsupported,

    #[error("Location permission is blocked; enable it in the device settings")]
    Blocked,

    #[error("Location permission was denied")]
    Denied,

    #[error("Timed out waiting for a position")]
    Timeout,

    #[error("Position is unavailable; check that GPS is enabled")]
    Unavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConsentError {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ConsentError::Unsupported => "unsupported",
            ConsentError::Blocked => "blocked",
            ConsentError::Denied => "denied",
            ConsentError::Timeout => "timeout",
            ConsentError::Unavailable => "unavailable",
            ConsentError::Store(_) => "store",
        }
    }
}

impl From<AcquisitionError> for ConsentError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::PermissionDenied => ConsentError::Denied,
            AcquisitionError::PositionUnavailable => ConsentError::Unavailable,
            AcquisitionError::Timeout => ConsentError::Timeout,
            AcquisitionError::Unsupported => ConsentError::Unsupported,
        }
    }
}

/// Why a capture failed.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Immutable view of the current sample used for geofence decisions.
#[derive(Debug, Clone, Copy)]
pub struct PositionSnapshot<'a> {
    sample: Option<&'a LocationSample>,
}

impl<'a> PositionSnapshot<'a> {
    pub fn new(sample: Option<&'a LocationSample>) -> Self {
        Self { sample }
    }

    pub fn sample(&self) -> Option<&'a LocationSample> {
        self.sample
    }

    /// Whether the latest sample is within `radius_meters` of `target`.
    /// Having no sample is never treated as being present.
    pub fn is_within_geofence(&self, target: &Coordinates, radius_meters: f64) -> bool {
        self.sample
            .is_some_and(|s| geofence::is_within(&s.coordinates(), target, radius_meters))
    }
}

/// Tracking status for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingStatus {
    pub has_consent: bool,
    pub is_tracking: bool,
    pub auto_suspended: bool,
    pub current: Option<LocationSample>,
}

/// Owns consent, the current sample and the sample history of one subject.
pub struct LocationTracker {
    subject_id: String,
    source: Arc<dyn PositionSource>,
    db: PresenceDb,
    sites: Arc<SiteDirectory>,
    clock: SharedClock,
    settings: TrackerSettings,
    consent: Option<ConsentRecord>,
    current: Option<LocationSample>,
    tracking: bool,
    auto_suspended: bool,
}

impl LocationTracker {
    /// Create a tracker, restoring any persisted consent. Tracking is not
    /// started here; the caller decides based on [`has_consent`](Self::has_consent).
    pub fn new(
        subject_id: &str,
        source: Arc<dyn PositionSource>,
        db: PresenceDb,
        sites: Arc<SiteDirectory>,
        clock: SharedClock,
        settings: TrackerSettings,
    ) -> Result<Self, StoreError> {
        let consent = db.get_consent(subject_id)?;
        Ok(Self {
            subject_id: subject_id.to_string(),
            source,
            db,
            sites,
            clock,
            settings,
            consent,
            current: None,
            tracking: false,
            auto_suspended: false,
        })
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn has_consent(&self) -> bool {
        self.consent.as_ref().is_some_and(|c| c.granted)
    }

    pub fn consent(&self) -> Option<&ConsentRecord> {
        self.consent.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Whether periodic sampling is paused after a permission denial.
    pub fn is_auto_suspended(&self) -> bool {
        self.auto_suspended
    }

    pub fn current(&self) -> Option<&LocationSample> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> PositionSnapshot<'_> {
        PositionSnapshot::new(self.current.as_ref())
    }

    pub fn is_within_geofence(&self, target: &Coordinates, radius_meters: f64) -> bool {
        self.snapshot().is_within_geofence(target, radius_meters)
    }

    pub fn status(&self) -> TrackingStatus {
        TrackingStatus {
            has_consent: self.has_consent(),
            is_tracking: self.tracking,
            auto_suspended: self.auto_suspended,
            current: self.current.clone(),
        }
    }

    pub fn history(&self) -> Result<Vec<LocationSample>, StoreError> {
        self.db.location_history(&self.subject_id)
    }

    /// Mark periodic tracking as running. Only allowed with consent.
    pub fn start_tracking(&mut self) -> bool {
        if !self.has_consent() {
            return false;
        }
        self.tracking = true;
        true
    }

    pub fn stop_tracking(&mut self) {
        self.tracking = false;
    }

    /// Whether `now` falls inside the working window.
    pub fn in_working_window(&self, now: NaiveDateTime) -> bool {
        let hour = now.hour();
        hour >= self.settings.window_start_hour && hour <= self.settings.window_end_hour
    }

    /// Ask for location permission and take a first sample.
    ///
    /// Fails fast without prompting when the device is unsupported or the
    /// permission is already known to be denied.
    pub async fn request_consent(&mut self) -> Result<LocationSample, ConsentError> {
        match self.source.permission() {
            PermissionState::Unsupported => {
                tracing::warn!(subject = %self.subject_id, "Geolocation unsupported");
                return Err(ConsentError::Unsupported);
            }
            PermissionState::Denied => {
                tracing::warn!(subject = %self.subject_id, "Location permission blocked");
                return Err(ConsentError::Blocked);
            }
            PermissionState::Granted | PermissionState::Prompt => {}
        }

        let fix = self.acquire().await.map_err(|err| {
            tracing::warn!(subject = %self.subject_id, error = %err, "Consent request failed");
            ConsentError::from(err)
        })?;

        let now = self.clock.now();
        let consent = ConsentRecord::granted(now);
        self.db.set_consent(&self.subject_id, &consent)?;
        self.consent = Some(consent);
        self.auto_suspended = false;

        let sample = self.record(fix, SampleOrigin::Manual, now)?;
        tracing::info!(subject = %self.subject_id, "Location consent granted");
        Ok(sample)
    }

    /// Revoke consent and stop tracking. Idempotent.
    pub fn revoke_consent(&mut self) -> Result<(), StoreError> {
        let consent = ConsentRecord::revoked(self.clock.now());
        self.db.set_consent(&self.subject_id, &consent)?;
        self.consent = Some(consent);
        self.stop_tracking();
        tracing::info!(subject = %self.subject_id, "Location consent revoked");
        Ok(())
    }

    /// Take a sample right now, outside the periodic schedule.
    pub async fn capture_now(
        &mut self,
        origin: SampleOrigin,
    ) -> Result<LocationSample, CaptureError> {
        if !self.has_consent() {
            return Err(AcquisitionError::PermissionDenied.into());
        }

        let fix = self.acquire().await.inspect_err(|err| {
            tracing::warn!(subject = %self.subject_id, error = %err, ?origin, "Capture failed");
        })?;

        if origin == SampleOrigin::Manual {
            self.auto_suspended = false;
        }
        let now = self.clock.now();
        Ok(self.record(fix, origin, now)?)
    }

    /// Periodic tick. Samples only while tracking, inside the working window,
    /// and not suspended. Failures are logged and left for the next tick.
    pub async fn periodic_sample(&mut self) -> Option<LocationSample> {
        let now = self.clock.now();
        if !self.tracking || !self.has_consent() {
            return None;
        }
        if self.auto_suspended {
            tracing::debug!(subject = %self.subject_id, "Automatic sampling suspended");
            return None;
        }
        if !self.in_working_window(now) {
            tracing::debug!(subject = %self.subject_id, %now, "Outside working window");
            return None;
        }

        match self.capture_now(SampleOrigin::Automatic).await {
            Ok(sample) => Some(sample),
            Err(CaptureError::Acquisition(AcquisitionError::PermissionDenied)) => {
                tracing::warn!(
                    subject = %self.subject_id,
                    "Permission denied; automatic sampling suspended until user action"
                );
                self.auto_suspended = true;
                None
            }
            Err(err) => {
                tracing::warn!(subject = %self.subject_id, error = %err, "Periodic sample failed");
                None
            }
        }
    }

    async fn acquire(&self) -> Result<PositionFix, AcquisitionError> {
        let options = self.settings.acquire;
        match tokio::time::timeout(options.timeout, self.source.acquire(options)).await {
            Ok(result) => result,
            Err(_) => Err(AcquisitionError::Timeout),
        }
    }

    fn record(
        &mut self,
        fix: PositionFix,
        origin: SampleOrigin,
        now: NaiveDateTime,
    ) -> Result<LocationSample, StoreError> {
        let coordinates = fix.coordinates();
        let sample = LocationSample {
            subject_id: self.subject_id.clone(),
            timestamp: now,
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_meters: fix.accuracy_meters,
            resolved_place: self
                .sites
                .resolve_place(&coordinates)
                .unwrap_or(UNRESOLVED_PLACE)
                .to_string(),
            origin,
        };

        self.db.append_location(&sample, self.settings.history_cap)?;
        self.current = Some(sample.clone());

        tracing::info!(
            subject = %self.subject_id,
            latitude = sample.latitude,
            longitude = sample.longitude,
            accuracy = sample.accuracy_meters,
            place = %sample.resolved_place,
            ?origin,
            "Location sample recorded"
        );
        Ok(sample)
    }
}

