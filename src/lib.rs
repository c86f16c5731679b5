// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Field-Presence: verify a field employee's presence by GPS proximity
//!
//! This crate tracks location under explicit consent and uses it to gate
//! daily branch activities and partner-meeting check-ins.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{Presence, ReportedPositionSource, SiteDirectory};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// The engine; one caller at a time.
    pub presence: Mutex<Presence>,
    /// Fix ingest for the device. Not behind the engine lock so a pending
    /// acquisition can be fed while the engine waits on it.
    pub position: ReportedPositionSource,
    pub sites: Arc<SiteDirectory>,
}
