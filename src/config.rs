// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::services::position::AcquireOptions;
use crate::services::tracker::TrackerSettings;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Employee whose presence is tracked
    pub subject_id: String,
    /// GeoJSON file with the assigned branch and partner sites
    pub sites_path: String,
    /// JSON file backing the record store
    pub store_path: String,
    /// Server port
    pub port: u16,

    // --- Tracking ---
    pub tracking_cadence_minutes: i64,
    pub tracking_start_hour: u32,
    pub tracking_end_hour: u32,
    pub acquire_timeout_secs: u64,
    pub acquire_max_age_secs: u64,
    pub history_cap: usize,

    /// Period of the scheduler driver in the binary
    pub tick_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            subject_id: "EMP001".to_string(),
            sites_path: "data/sites.geojson".to_string(),
            store_path: "data/presence-store.json".to_string(),
            port: 8080,
            tracking_cadence_minutes: 60,
            tracking_start_hour: 9,
            tracking_end_hour: 21,
            acquire_timeout_secs: 15,
            acquire_max_age_secs: 600,
            history_cap: 100,
            tick_secs: 30,
        }
    }
}

impl Config {
    /// Config for tests; same as the defaults.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        let config = Self {
            subject_id: env::var("SUBJECT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUBJECT_ID"))?,
            sites_path: env::var("SITES_PATH").unwrap_or(defaults.sites_path),
            store_path: env::var("STORE_PATH").unwrap_or(defaults.store_path),
            port: parse_var("PORT", defaults.port)?,
            tracking_cadence_minutes: parse_var(
                "TRACKING_CADENCE_MINUTES",
                defaults.tracking_cadence_minutes,
            )?,
            tracking_start_hour: parse_var("TRACKING_START_HOUR", defaults.tracking_start_hour)?,
            tracking_end_hour: parse_var("TRACKING_END_HOUR", defaults.tracking_end_hour)?,
            acquire_timeout_secs: parse_var("ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs)?,
            acquire_max_age_secs: parse_var("ACQUIRE_MAX_AGE_SECS", defaults.acquire_max_age_secs)?,
            history_cap: parse_var("HISTORY_CAP", defaults.history_cap)?,
            tick_secs: parse_var("TICK_SECS", defaults.tick_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_id.is_empty() {
            return Err(ConfigError::Missing("SUBJECT_ID"));
        }
        if self.tracking_start_hour > 23 {
            return Err(ConfigError::Invalid("TRACKING_START_HOUR", "must be 0..=23"));
        }
        if self.tracking_end_hour > 23 || self.tracking_end_hour < self.tracking_start_hour {
            return Err(ConfigError::Invalid(
                "TRACKING_END_HOUR",
                "must be 0..=23 and not before TRACKING_START_HOUR",
            ));
        }
        if self.tracking_cadence_minutes <= 0 {
            return Err(ConfigError::Invalid("TRACKING_CADENCE_MINUTES", "must be positive"));
        }
        if self.history_cap == 0 {
            return Err(ConfigError::Invalid("HISTORY_CAP", "must be positive"));
        }
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid("TICK_SECS", "must be positive"));
        }
        Ok(())
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            cadence: chrono::Duration::minutes(self.tracking_cadence_minutes),
            window_start_hour: self.tracking_start_hour,
            window_end_hour: self.tracking_end_hour,
            acquire: AcquireOptions {
                timeout: Duration::from_secs(self.acquire_timeout_secs),
                max_age: Duration::from_secs(self.acquire_max_age_secs),
            },
            history_cap: self.history_cap,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, "not a valid number")),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
