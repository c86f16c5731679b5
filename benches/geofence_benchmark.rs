use criterion::{black_box, criterion_group, criterion_main, Criterion};
use field_presence::models::Coordinates;
use field_presence::services::geofence;
use field_presence::services::SiteDirectory;

fn benchmark_resolve_place(c: &mut Criterion) {
    // Load the directory once
    let sites = SiteDirectory::load_from_file("data/sites.geojson").expect("Failed to load sites");

    // A position at the branch and one far from every site
    let at_branch = Coordinates::new(40.7130, -74.0058);
    let far_away = Coordinates::new(41.5, -75.0);

    let mut group = c.benchmark_group("resolve_place");

    group.bench_function("inside_branch_fence", |b| {
        b.iter(|| sites.resolve_place(black_box(&at_branch)))
    });

    group.bench_function("outside_all_fences", |b| {
        b.iter(|| sites.resolve_place(black_box(&far_away)))
    });

    group.finish();

    c.bench_function("haversine_distance", |b| {
        b.iter(|| geofence::distance_meters(black_box(&at_branch), black_box(&far_away)))
    });
}

criterion_group!(benches, benchmark_resolve_place);
criterion_main!(benches);
