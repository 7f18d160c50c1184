//! Threat/Fusion: distance-to-operator, geofence membership, and the weighted
//! threat-score rule set (§4.8).

use ridsentinel_common::{haversine_distance_m, GeofenceZone};
use ridsentinel_types::{LocationVector, ThreatAssessment, ThreatLevel};

#[derive(Clone, Copy, Debug)]
pub struct ThreatLimits {
    pub height_agl_limit_m: f32,
    pub speed_limit_mps: f32,
    pub operator_distance_limit_m: f64,
}

impl Default for ThreatLimits {
    fn default() -> Self {
        Self {
            height_agl_limit_m: 120.0,
            speed_limit_mps: 20.0,
            operator_distance_limit_m: 5000.0,
        }
    }
}

/// Everything the rule set needs about one detection, gathered from whichever
/// field groups the Remote ID record happened to carry.
#[derive(Clone, Debug, Default)]
pub struct ThreatInput<'a> {
    pub location: Option<&'a LocationVector>,
    pub operator_location: Option<(f64, f64)>,
    pub has_remote_id: bool,
    pub classifier_invalid: bool,
}

/// Apply the §4.8 rule set and return the scored verdict plus the operator distance
/// and matched zone name, if any, for provenance attachment.
pub fn assess<'a>(input: &ThreatInput<'a>, zones: &[GeofenceZone], limits: ThreatLimits) -> (ThreatAssessment, Option<f64>, Option<String>) {
    let mut score = 0i32;
    let mut reasons = Vec::new();
    let mut operator_distance_m = None;
    let mut zone_name = None;

    if let Some(loc) = input.location {
        if let (Some(lat), Some(lon)) = (loc.latitude, loc.longitude) {
            if let Some(zone) = zones.iter().find(|z| z.contains(lat, lon)) {
                score += 50;
                reasons.push(format!("inside restricted zone {}", zone.name));
                zone_name = Some(zone.name.clone());
            }

            if let Some((op_lat, op_lon)) = input.operator_location {
                let distance = haversine_distance_m(lat, lon, op_lat, op_lon);
                operator_distance_m = Some(distance);
                if distance > limits.operator_distance_limit_m {
                    score += 15;
                    reasons.push(format!("operator distance {distance:.0} m exceeds limit"));
                }
            }
        }

        if let Some(height) = loc.height_agl_m {
            if height > limits.height_agl_limit_m {
                score += 20;
                reasons.push(format!("height AGL {height:.0} m exceeds limit"));
            }
        }

        if let Some(speed) = loc.speed_mps {
            if speed > limits.speed_limit_mps {
                score += 10;
                reasons.push(format!("speed {speed:.1} m/s exceeds limit"));
            }
        }
    }

    if !input.has_remote_id {
        score += 20;
        reasons.push("no Remote ID present".to_string());
    } else {
        score -= 10;
    }

    if input.classifier_invalid {
        score += 10;
        reasons.push("classifier verdict invalid".to_string());
    }

    let level = if score >= 50 {
        ThreatLevel::High
    } else if score >= 20 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    };

    (ThreatAssessment { score, level, reasons }, operator_distance_m, zone_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridsentinel_types::OperationalStatus;

    /// Scenario E.
    #[test]
    fn test_scenario_e_threat_assessment() {
        let zones = vec![GeofenceZone::new("restricted-a", 12.3714, -1.5197, 5.0)];

        let location = LocationVector {
            status: OperationalStatus::Airborne,
            direction_deg: None,
            speed_mps: Some(25.0),
            vertical_speed_mps: None,
            latitude: Some(12.3714),
            longitude: Some(-1.5197),
            altitude_msl_m: None,
            height_agl_m: Some(200.0),
        };

        let input = ThreatInput {
            location: Some(&location),
            operator_location: Some((12.4, -1.6)),
            has_remote_id: true,
            classifier_invalid: false,
        };

        let (assessment, distance, zone) = assess(&input, &zones, ThreatLimits::default());
        assert_eq!(85, assessment.score);
        assert_eq!(ThreatLevel::High, assessment.level);
        assert_eq!(4, assessment.reasons.len());
        assert!(distance.unwrap() > 5000.0);
        assert_eq!(Some("restricted-a".to_string()), zone);
    }

    #[test]
    fn test_no_remote_id_scores_low_without_position() {
        let input = ThreatInput { has_remote_id: false, ..Default::default() };
        let (assessment, _, _) = assess(&input, &[], ThreatLimits::default());
        assert_eq!(20, assessment.score);
        assert_eq!(ThreatLevel::Medium, assessment.level);
    }
}
