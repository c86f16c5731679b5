// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location samples and consent records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Convert to a `geo` point (x = longitude, y = latitude).
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// Who asked for a sample to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleOrigin {
    /// Triggered by a user action.
    Manual,
    /// Taken by the periodic tracking schedule.
    Automatic,
}

/// One stored position fix for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub subject_id: String,
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    /// Name of the known site the fix falls inside, or a placeholder.
    pub resolved_place: String,
    pub origin: SampleOrigin,
}

impl LocationSample {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Location tracking consent. Superseded on every grant or revoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub granted: bool,
    pub granted_at: NaiveDateTime,
    pub revocable: bool,
}

impl ConsentRecord {
    pub fn granted(at: NaiveDateTime) -> Self {
        Self {
            granted: true,
            granted_at: at,
            revocable: true,
        }
    }

    pub fn revoked(at: NaiveDateTime) -> Self {
        Self {
            granted: false,
            granted_at: at,
            revocable: true,
        }
    }
}
