//! Benchmarks the great-circle distance math used by the threat-assessment stage on
//! every detection: `haversine_distance_m` and zone-list membership lookup.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ridsentinel_common::{haversine_distance_m, zone_membership, GeofenceZone};

fn setup_zones() -> Vec<GeofenceZone> {
    vec![
        GeofenceZone::new("airport", 48.573174, 2.319671, 5.0),
        GeofenceZone::new("stadium", 48.566757, 2.303015, 1.0),
        GeofenceZone::new("prison", 48.858370, 2.294481, 2.0),
    ]
}

fn bench_haversine(c: &mut Criterion) {
    c.bench_function("haversine_distance_m", |b| {
        b.iter(|| black_box(haversine_distance_m(48.573174, 2.319671, 48.566757, 2.303015)))
    });
}

fn bench_zone_membership(c: &mut Criterion) {
    let zones = setup_zones();

    c.bench_function("zone_membership/3-zones", |b| {
        b.iter(|| black_box(zone_membership(&zones, 48.566757, 2.303015)))
    });
}

criterion_group!(benches, bench_haversine, bench_zone_membership);
criterion_main!(benches);
