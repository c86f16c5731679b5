// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field-Presence API Server
//!
//! Serves the presence engine to the presentation layer on the device and
//! drives its scheduler from the wall clock.

use field_presence::{
    config::Config,
    db::{FileStore, PresenceDb},
    services::{presence, LogNotifier, Presence, ReportedPositionSource, SiteDirectory},
    time_utils::{SharedClock, SystemClock},
    AppState,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        subject = %config.subject_id,
        "Starting Field-Presence API"
    );

    // Open the record store
    tracing::info!(path = %config.store_path, "Opening record store");
    let store = FileStore::open(&config.store_path).expect("Failed to open record store");
    let db = PresenceDb::new(Arc::new(store));

    // Load branch and partner sites
    tracing::info!(path = %config.sites_path, "Loading sites");
    let sites = Arc::new(SiteDirectory::load_from_file(&config.sites_path).expect("Failed to load sites"));
    tracing::info!(
        branch = %sites.branch().name,
        partners = sites.partners().len(),
        "Sites loaded"
    );

    let clock: SharedClock = Arc::new(SystemClock);
    let position = ReportedPositionSource::new(clock.clone());

    let engine = Presence::new(
        &config,
        Arc::new(position.clone()),
        db,
        sites.clone(),
        Arc::new(LogNotifier),
        clock,
    )
    .expect("Failed to initialize presence engine");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        presence: Mutex::new(engine),
        position,
        sites,
    });

    // Drive scheduled jobs
    tokio::spawn(presence::run_scheduler(
        state.clone(),
        std::time::Duration::from_secs(config.tick_secs),
    ));
    tracing::info!(tick_secs = config.tick_secs, "Scheduler started");

    // Build router
    let app = field_presence::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("field_presence=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
