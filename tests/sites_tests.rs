// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Site directory smoke tests against the shipped data file.
//!
//! If these fail, every geofence decision in the server is suspect.

use field_presence::models::{Coordinates, SiteKind};
use field_presence::services::SiteDirectory;

fn load_sites() -> SiteDirectory {
    SiteDirectory::load_from_file("data/sites.geojson")
        .expect("Failed to load sites - is data/ committed?")
}

#[test]
fn test_sites_load() {
    let sites = load_sites();
    assert_eq!(sites.branch().id, "BR001");
    assert_eq!(sites.branch().kind, SiteKind::Branch);
    assert_eq!(sites.branch().radius_meters, 100.0);

    let codes: Vec<&str> = sites.partners().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(codes, vec!["PA001", "PA002", "PA003"]);
    assert!(sites.partners().iter().all(|p| p.kind == SiteKind::Partner));
    assert!(sites.partners().iter().all(|p| !p.address.is_empty()));
}

#[test]
fn test_partner_lookup() {
    let sites = load_sites();
    let partner = sites.partner("PA002").expect("PA002 should exist");
    assert_eq!(partner.name, "XYZ Financial Services");
    assert_eq!(partner.sub_category.as_deref(), Some("POSP"));
    assert!(sites.partner("PA999").is_none());
}

#[test]
fn test_resolve_each_site_at_its_anchor() {
    let sites = load_sites();
    assert_eq!(
        sites.resolve_place(&sites.branch().anchor),
        Some("Main Branch Office")
    );
    for partner in sites.partners() {
        assert_eq!(sites.resolve_place(&partner.anchor), Some(partner.name.as_str()));
    }
    assert_eq!(sites.resolve_place(&Coordinates::new(0.0, 0.0)), None);
}
