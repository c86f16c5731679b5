// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, NaiveDate, NaiveDateTime};
use field_presence::config::Config;
use field_presence::db::PresenceDb;
use field_presence::models::Coordinates;
use field_presence::routes::create_router;
use field_presence::services::{
    Job, MemoryNotifier, MockPositionSource, Presence, ReportedPositionSource, SiteDirectory,
};
use field_presence::time_utils::{Clock, ManualClock};
use field_presence::AppState;
use std::sync::Arc;
use tokio::sync::Mutex;

#[allow(dead_code)]
pub const BRANCH: Coordinates = Coordinates {
    latitude: 40.7128,
    longitude: -74.0060,
};

/// ABC Insurance Agency.
#[allow(dead_code)]
pub const PA001: Coordinates = Coordinates {
    latitude: 40.7589,
    longitude: -73.9851,
};

/// A Monday.
#[allow(dead_code)]
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Point `meters` due north of `origin`.
#[allow(dead_code)]
pub fn offset_north(origin: Coordinates, meters: f64) -> Coordinates {
    let degrees = meters / 6_371_008.8 * (180.0 / std::f64::consts::PI);
    Coordinates::new(origin.latitude + degrees, origin.longitude)
}

/// Sites shipped with the server.
#[allow(dead_code)]
pub fn test_sites() -> Arc<SiteDirectory> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sites.geojson");
    Arc::new(SiteDirectory::load_from_file(path).expect("Failed to load test sites"))
}

/// Engine wired to a manual clock, a scripted position source, an in-memory
/// store and a recording notifier. Starts at 08:00.
#[allow(dead_code)]
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub source: MockPositionSource,
    pub db: PresenceDb,
    pub notifier: MemoryNotifier,
    pub presence: Presence,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::test_default())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(at(8, 0)));
        Self::restore(config, clock, PresenceDb::new_in_memory())
    }

    /// Build a fresh engine over existing storage, as after a restart.
    pub fn restore(config: Config, clock: Arc<ManualClock>, db: PresenceDb) -> Self {
        let source = MockPositionSource::new();
        let notifier = MemoryNotifier::new();
        let presence = Presence::new(
            &config,
            Arc::new(source.clone()),
            db.clone(),
            test_sites(),
            Arc::new(notifier.clone()),
            clock.clone(),
        )
        .expect("Failed to build presence engine");
        Self {
            clock,
            source,
            db,
            notifier,
            presence,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Place the device.
    pub fn place(&self, position: Coordinates) {
        self.source.set_position(position, 10.0);
    }

    /// Grant consent with the device at `position`.
    pub async fn grant_consent_at(&mut self, position: Coordinates) {
        self.place(position);
        self.presence
            .request_consent()
            .await
            .expect("Consent should be granted");
    }

    /// Move the device and take a manual sample.
    pub async fn capture_at(&mut self, position: Coordinates) {
        self.place(position);
        self.presence
            .capture_now()
            .await
            .expect("Capture should succeed");
    }

    /// Step virtual time one minute at a time up to `target`, running due
    /// jobs at every step. Returns every job that fired.
    pub async fn advance_to(&mut self, target: NaiveDateTime) -> Vec<Job> {
        let mut fired = Vec::new();
        while self.now() < target {
            let step = (target - self.now()).min(Duration::minutes(1));
            self.clock.advance(step);
            fired.extend(self.presence.run_due().await);
        }
        fired
    }

    pub async fn advance_minutes(&mut self, minutes: i64) -> Vec<Job> {
        let target = self.now() + Duration::minutes(minutes);
        self.advance_to(target).await
    }
}

/// Create a test app around a reported position source and a manual clock.
/// Returns the router, the shared state and the clock.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<ManualClock>) {
    let config = Config::test_default();
    let clock = Arc::new(ManualClock::new(at(9, 0)));
    let position = ReportedPositionSource::new(clock.clone());
    let sites = test_sites();

    let presence = Presence::new(
        &config,
        Arc::new(position.clone()),
        PresenceDb::new_in_memory(),
        sites.clone(),
        Arc::new(MemoryNotifier::new()),
        clock.clone(),
    )
    .expect("Failed to build presence engine");

    let state = Arc::new(AppState {
        config,
        presence: Mutex::new(presence),
        position,
        sites,
    });

    (create_router(state.clone()), state, clock)
}
