// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Known sites (the assigned branch and existing partners) with their geofences.

use crate::models::location::Coordinates;
use crate::services::geofence;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Branch,
    Partner,
}

/// A fixed location with a circular geofence.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Branch id or partner agent code (e.g., "BR001", "PA001")
    pub id: String,
    pub name: String,
    pub address: String,
    pub kind: SiteKind,
    pub anchor: Coordinates,
    pub radius_meters: f64,
    /// Partner channel (IC, POSP, ASO, ...)
    pub sub_category: Option<String>,
    pub contact_no: Option<String>,
}

impl Site {
    /// Check whether a position falls inside this site's geofence.
    pub fn contains(&self, position: &Coordinates) -> bool {
        geofence::is_within(position, &self.anchor, self.radius_meters)
    }
}

/// Summary of an existing partner for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PartnerSummary {
    pub agent_code: String,
    pub name: String,
    pub address: String,
    pub sub_category: Option<String>,
    pub contact_no: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Site> for PartnerSummary {
    fn from(site: &Site) -> Self {
        Self {
            agent_code: site.id.clone(),
            name: site.name.clone(),
            address: site.address.clone(),
            sub_category: site.sub_category.clone(),
            contact_no: site.contact_no.clone(),
            latitude: site.anchor.latitude,
            longitude: site.anchor.longitude,
        }
    }
}
