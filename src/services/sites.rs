// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Site directory: the assigned branch and the existing-partner directory.
//!
//! Sites are loaded from a GeoJSON FeatureCollection of Point features with
//! `id`, `name`, `kind` ("branch" or "partner"), and optional `address`,
//! `radius_meters`, `sub_category`, `contact_no` properties.

use crate::models::{Coordinates, Site, SiteKind};
use crate::services::geofence::{self, DEFAULT_RADIUS_METERS};
use geo::Point;
use geojson::GeoJson;
use std::fs;
use std::path::Path;

/// Placeholder used when a position is not inside any known site.
pub const UNRESOLVED_PLACE: &str = "Unresolved location";

/// Directory of known sites.
#[derive(Debug, Clone)]
pub struct SiteDirectory {
    branch: Site,
    partners: Vec<Site>,
}

impl SiteDirectory {
    pub fn new(branch: Site, partners: Vec<Site>) -> Self {
        Self { branch, partners }
    }

    /// Load sites from a GeoJSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| SiteError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load sites from a GeoJSON string. The first branch feature becomes the
    /// assigned branch.
    pub fn load_from_json(json_data: &str) -> Result<Self, SiteError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| SiteError::ParseError(e.to_string()))?;

        let mut branch = None;
        let mut partners = Vec::new();

        if let GeoJson::FeatureCollection(collection) = geojson {
            for feature in collection.features {
                let text = |name: &str| {
                    feature
                        .property(name)
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                };

                let Some(id) = text("id").filter(|id| !id.is_empty()) else {
                    continue;
                };

                let kind = match text("kind").as_deref() {
                    Some("branch") => SiteKind::Branch,
                    Some("partner") => SiteKind::Partner,
                    other => {
                        return Err(SiteError::UnknownKind(
                            other.unwrap_or("<missing>").to_string(),
                        ))
                    }
                };

                let radius_meters = feature
                    .property("radius_meters")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(DEFAULT_RADIUS_METERS);

                let Some(geom) = feature.geometry.clone() else {
                    continue;
                };
                let anchor = Self::convert_geometry(geom.value)?;

                let site = Site {
                    name: text("name").unwrap_or_else(|| id.clone()),
                    id,
                    address: text("address").unwrap_or_default(),
                    kind,
                    anchor,
                    radius_meters,
                    sub_category: text("sub_category"),
                    contact_no: text("contact_no"),
                };

                match kind {
                    SiteKind::Branch if branch.is_none() => branch = Some(site),
                    SiteKind::Branch => {
                        tracing::warn!(id = %site.id, "Ignoring additional branch feature")
                    }
                    SiteKind::Partner => partners.push(site),
                }
            }
        }

        let branch = branch.ok_or(SiteError::MissingBranch)?;
        tracing::info!(
            branch = %branch.id,
            partners = partners.len(),
            "Loaded sites"
        );
        Ok(Self { branch, partners })
    }

    /// Convert GeoJSON geometry to an anchor coordinate.
    fn convert_geometry(value: geojson::Value) -> Result<Coordinates, SiteError> {
        use std::convert::TryInto;

        let point: Point<f64> = value
            .try_into()
            .map_err(|_| SiteError::UnsupportedGeometry)?;
        Ok(Coordinates::new(point.y(), point.x()))
    }

    /// The subject's assigned branch.
    pub fn branch(&self) -> &Site {
        &self.branch
    }

    pub fn partners(&self) -> &[Site] {
        &self.partners
    }

    pub fn partner(&self, agent_code: &str) -> Option<&Site> {
        self.partners.iter().find(|p| p.id == agent_code)
    }

    /// Name of the nearest known site whose geofence contains `position`.
    pub fn resolve_place(&self, position: &Coordinates) -> Option<&str> {
        std::iter::once(&self.branch)
            .chain(self.partners.iter())
            .filter(|site| site.contains(position))
            .min_by(|a, b| {
                let da = geofence::distance_meters(position, &a.anchor);
                let db = geofence::distance_meters(position, &b.anchor);
                da.total_cmp(&db)
            })
            .map(|site| site.name.as_str())
    }
}

/// Errors from site loading.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Unsupported geometry type (expected Point)")]
    UnsupportedGeometry,

    #[error("Unknown site kind: {0}")]
    UnknownKind(String),

    #[error("No branch feature found")]
    MissingBranch,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-74.0060, 40.7128] },
                "properties": { "id": "BR001", "name": "Main Branch Office", "kind": "branch", "radius_meters": 100 }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-73.9851, 40.7589] },
                "properties": { "id": "PA001", "name": "ABC Insurance Agency", "kind": "partner", "sub_category": "IC" }
            }
        ]
    }"#;

    #[test]
    fn test_load_sites() {
        let sites = SiteDirectory::load_from_json(SITES).unwrap();
        assert_eq!(sites.branch().id, "BR001");
        let anchor = sites.branch().anchor;
        assert!((anchor.latitude - 40.7128).abs() < 1e-9);
        assert!((anchor.longitude + 74.0060).abs() < 1e-9);
        assert_eq!(sites.partners().len(), 1);
        let partner = sites.partner("PA001").unwrap();
        assert_eq!(partner.radius_meters, DEFAULT_RADIUS_METERS);
        assert_eq!(partner.sub_category.as_deref(), Some("IC"));
    }

    #[test]
    fn test_resolve_place() {
        let sites = SiteDirectory::load_from_json(SITES).unwrap();
        assert_eq!(
            sites.resolve_place(&Coordinates::new(40.7128, -74.0060)),
            Some("Main Branch Office")
        );
        assert_eq!(sites.resolve_place(&Coordinates::new(41.0, -75.0)), None);
    }

    #[test]
    fn test_missing_branch() {
        let json = SITES.replace("\"kind\": \"branch\"", "\"kind\": \"partner\"");
        assert!(matches!(
            SiteDirectory::load_from_json(&json),
            Err(SiteError::MissingBranch)
        ));
    }

    #[test]
    fn test_polygon_rejected() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] },
                "properties": { "id": "BR001", "kind": "branch" }
            }]
        }"#;
        assert!(matches!(
            SiteDirectory::load_from_json(json),
            Err(SiteError::UnsupportedGeometry)
        ));
    }
}
