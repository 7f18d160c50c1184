//! Geofence zones and distance math.
//!
//! A [`GeofenceZone`] is a named circle (center lat/lon, radius in km). The zone list is
//! process-wide and read-only after load: the Orchestrator only ever reads it when scoring
//! threat assessment, never mutates it.

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;

/// Mean earth radius in meters, per WGS-84 conventions used elsewhere in this crate.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A named circular restricted area.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GeofenceZone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in kilometers.
    pub radius_km: f64,
}

impl GeofenceZone {
    pub fn new(name: &str, latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
            radius_km,
        }
    }

    /// True if `(lat, lon)` falls within this zone's radius.
    #[tracing::instrument(skip(self))]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        haversine_distance_m(self.latitude, self.longitude, lat, lon) <= self.radius_km * 1000.0
    }
}

/// Great-circle distance between two lat/lon points, in meters.
#[tracing::instrument]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Find the first zone (if any) containing `(lat, lon)`.
#[tracing::instrument(skip(zones))]
pub fn zone_membership<'a>(zones: &'a [GeofenceZone], lat: f64, lon: f64) -> Option<&'a GeofenceZone> {
    zones.iter().find(|z| z.contains(lat, lon))
}

/// Render the configured zones as a `tabled` table, for CLI diagnostics.
pub fn list_zones(zones: &[GeofenceZone]) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["Name", "Latitude", "Longitude", "Radius (km)"]);
    for z in zones {
        builder.push_record(vec![
            z.name.clone(),
            format!("{:.5}", z.latitude),
            format!("{:.5}", z.longitude),
            format!("{:.1}", z.radius_km),
        ]);
    }
    builder.build().with(Style::modern()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_haversine_same_point_is_zero() {
        assert_eq!(0.0, haversine_distance_m(12.3714, -1.5197, 12.3714, -1.5197));
    }

    #[test]
    fn test_haversine_known_distance() {
        // Roughly 1 degree of latitude is ~111.2 km.
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 500.0);
    }

    #[test]
    fn test_zone_contains_center() {
        let z = GeofenceZone::new("test", 12.3714, -1.5197, 5.0);
        assert!(z.contains(12.3714, -1.5197));
    }

    #[test]
    fn test_zone_scenario_e_membership() {
        // Scenario E: record inside a 5km zone centered at (12.3714, -1.5197).
        let z = GeofenceZone::new("scenario-e", 12.3714, -1.5197, 5.0);
        // A point ~1km away should still be inside.
        assert!(z.contains(12.380, -1.5197));
    }

    #[test]
    fn test_zone_membership_first_match() {
        let zones = vec![
            GeofenceZone::new("a", 0.0, 0.0, 1.0),
            GeofenceZone::new("b", 12.3714, -1.5197, 5.0),
        ];
        let m = zone_membership(&zones, 12.3714, -1.5197);
        assert_eq!(Some(&zones[1]), m);
    }

    #[rstest]
    #[case::outside(0.0, 0.0, 10.0, 10.0, false)]
    #[case::center(12.3714, -1.5197, 12.3714, -1.5197, true)]
    #[case::edge_just_inside(12.3714, -1.5197, 12.380, -1.5197, true)]
    fn zone_containment_matches_expectation(
        #[case] zlat: f64,
        #[case] zlon: f64,
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] expected: bool,
    ) {
        let z = GeofenceZone::new("fixture", zlat, zlon, 5.0);
        assert_eq!(expected, z.contains(lat, lon));
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(
            lat1 in -90.0f64..90.0, lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lon2 in -180.0f64..180.0,
        ) {
            let fwd = haversine_distance_m(lat1, lon1, lat2, lon2);
            let rev = haversine_distance_m(lat2, lon2, lat1, lon1);
            prop_assert!((fwd - rev).abs() < 1e-6);
        }

        #[test]
        fn haversine_is_never_negative(
            lat1 in -90.0f64..90.0, lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lon2 in -180.0f64..180.0,
        ) {
            prop_assert!(haversine_distance_m(lat1, lon1, lat2, lon2) >= 0.0);
        }

        #[test]
        fn containment_respects_radius_monotonically(
            zlat in -80.0f64..80.0, zlon in -170.0f64..170.0,
            lat in -80.0f64..80.0, lon in -170.0f64..170.0,
            radius_km in 0.1f64..500.0,
        ) {
            let d_m = haversine_distance_m(zlat, zlon, lat, lon);
            let z = GeofenceZone::new("prop", zlat, zlon, radius_km);
            prop_assert_eq!(d_m <= radius_km * 1000.0, z.contains(lat, lon));
        }
    }
}
