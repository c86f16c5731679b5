// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Circular geofence containment using great-circle distance.
//!
//! This is the only proximity test in the crate; every presence decision goes
//! through [`is_within`].

use crate::models::Coordinates;
use geo::{Distance, Haversine};

/// Default geofence radius for branches and partner locations.
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance_meters(a: &Coordinates, b: &Coordinates) -> f64 {
    Haversine.distance(a.to_point(), b.to_point())
}

/// Boundary-inclusive containment: `distance <= radius`.
pub fn is_within(position: &Coordinates, center: &Coordinates, radius_meters: f64) -> bool {
    distance_meters(position, center) <= radius_meters
}
