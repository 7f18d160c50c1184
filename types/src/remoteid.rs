//! The decoded ASTM F3411 / OpenDroneID Remote ID record.
//!
//! Every field group is optional: a record starts empty and is populated incrementally
//! as Basic-ID, Location/Vector, Authentication, Self-ID, System and Operator-ID messages
//! are encountered within a burst. See the Remote ID Decoder for how these are assembled.
//!

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// `uas_id_type`, byte 0 of a Basic-ID message (low nibble).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, strum::Display, EnumString)]
pub enum UasIdType {
    #[default]
    None,
    #[strum(serialize = "Serial Number")]
    SerialNumber,
    #[strum(serialize = "CAA Registration ID")]
    CaaRegistrationId,
    #[strum(serialize = "UTM UUID")]
    UtmUuid,
    #[strum(serialize = "Specific Session ID")]
    SpecificSessionId,
    /// Produced only by the pattern-fallback scan, never by the structured path.
    #[strum(serialize = "Pattern Detection (dji_remote_id)")]
    PatternDetection,
}

impl UasIdType {
    /// Map the wire nibble (0-4) from a structured Basic-ID message.
    pub fn from_wire(v: u8) -> Self {
        match v {
            1 => UasIdType::SerialNumber,
            2 => UasIdType::CaaRegistrationId,
            3 => UasIdType::UtmUuid,
            4 => UasIdType::SpecificSessionId,
            _ => UasIdType::None,
        }
    }

    /// Whether this type is accepted by the §3/§4.6 validity filter.
    pub fn is_recognized(&self) -> bool {
        matches!(
            self,
            UasIdType::SerialNumber
                | UasIdType::CaaRegistrationId
                | UasIdType::UtmUuid
                | UasIdType::SpecificSessionId
        )
    }
}

/// Airborne/ground status carried in a Location/Vector message's status byte.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, strum::Display, EnumString)]
pub enum OperationalStatus {
    #[default]
    Undeclared,
    Ground,
    Airborne,
    Emergency,
    RemoteIdSystemFailure,
}

/// Which transport a record (or a field-group inside it) was captured on.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, strum::Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    WifiBeacon,
    WifiActionNan,
    BleAdvertising,
    PatternDetection,
}

/// Basic-ID message fields (§3, §4.6 type 0x0).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BasicId {
    pub uas_id_type: UasIdType,
    /// ASCII-printable, 6-32 bytes per the validity filter.
    pub uas_id: String,
}

/// Location/Vector message fields (§3, §4.6 type 0x1). All angular/altitude sentinels
/// are already resolved to `None` by the decoder; they never leak as raw integers.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct LocationVector {
    pub status: OperationalStatus,
    /// Degrees true, 0-359. `None` when the wire byte was the 0xFF sentinel.
    pub direction_deg: Option<u16>,
    /// Meters/second, 0.25 m/s steps. `None` when the wire byte was 0xFF.
    pub speed_mps: Option<f32>,
    /// Meters/second, signed, 0.5 m/s steps. `None` when the wire byte was 0x7F.
    pub vertical_speed_mps: Option<f32>,
    /// Degrees, 1e-7 resolution.
    pub latitude: Option<f64>,
    /// Degrees, 1e-7 resolution.
    pub longitude: Option<f64>,
    /// Meters above mean sea level. `None` when the raw field equals the -1000 sentinel.
    pub altitude_msl_m: Option<f32>,
    /// Meters above ground level. `None` when the raw field equals the -1000 sentinel.
    pub height_agl_m: Option<f32>,
}

/// Authentication message fields (§3, §4.6 type 0x2). Per Open Question 3, only
/// single-page capture is implemented; multi-page reassembly is out of scope.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Authentication {
    pub auth_type: u8,
    pub page_index: u8,
    pub last_page_index: u8,
    pub payload: Vec<u8>,
}

/// Self-ID message fields (§3, §4.6 type 0x3).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SelfId {
    pub description_type: u8,
    pub description: String,
}

/// System message fields (§3, §4.6 type 0x4).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SystemInfo {
    pub operator_location_type: u8,
    pub eu_class: u8,
    pub category: u8,
    pub operator_latitude: Option<f64>,
    pub operator_longitude: Option<f64>,
    pub operator_altitude_m: Option<f32>,
}

/// Operator-ID message fields (§3, §4.6 type 0x5).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct OperatorId {
    pub id_type: u8,
    pub operator_id: String,
}

/// Capture-time provenance, always populated by whichever component emits the record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Provenance {
    pub source_timestamp: DateTime<Utc>,
    pub transport: Transport,
    /// Source MAC (Wi-Fi) or BLE address, as captured.
    pub source_address: Option<String>,
    pub center_freq_hz: Option<u64>,
    pub gain_db: Option<f32>,
}

/// The merged Remote ID record: every field group is optional and populated
/// incrementally as matching ASTM F3411 message types are decoded from a burst.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RemoteIdRecord {
    pub basic_id: Option<BasicId>,
    pub location_vector: Option<LocationVector>,
    pub authentication: Option<Authentication>,
    pub self_id: Option<SelfId>,
    pub system: Option<SystemInfo>,
    pub operator_id: Option<OperatorId>,
    pub provenance: Provenance,
}

impl RemoteIdRecord {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            basic_id: None,
            location_vector: None,
            authentication: None,
            self_id: None,
            system: None,
            operator_id: None,
            provenance,
        }
    }

    /// §3 invariant 1 / §8 invariant 3: a record may only be emitted if one of the three
    /// acceptance conditions holds.
    pub fn is_emittable(&self) -> bool {
        let basic_id_ok = self
            .basic_id
            .as_ref()
            .map(|b| b.uas_id_type.is_recognized() && is_printable_id(&b.uas_id))
            .unwrap_or(false);

        let position_ok = self
            .location_vector
            .as_ref()
            .map(|l| match (l.latitude, l.longitude) {
                (Some(lat), Some(lon)) => lat != 0.0 && lon != 0.0,
                _ => false,
            })
            .unwrap_or(false);

        let pattern_ok = self.provenance.transport == Transport::PatternDetection;

        basic_id_ok || position_ok || pattern_ok
    }
}

/// §4.6 validity filter: ASCII-printable, length 6-32, not a run of zeros/spaces/dashes.
pub fn is_printable_id(s: &str) -> bool {
    if s.len() < 6 || s.len() > 32 {
        return false;
    }
    if !s.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return false;
    }
    !s.bytes().all(|b| matches!(b, b'0' | b' ' | b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance(transport: Transport) -> Provenance {
        Provenance {
            source_timestamp: Utc::now(),
            transport,
            source_address: None,
            center_freq_hz: None,
            gain_db: None,
        }
    }

    #[test]
    fn test_is_printable_id_accepts_scenario_a() {
        assert!(is_printable_id("DJI-TEST-001"));
    }

    #[test]
    fn test_is_printable_id_rejects_short() {
        assert!(!is_printable_id("ABC"));
    }

    #[test]
    fn test_is_printable_id_rejects_dash_run() {
        assert!(!is_printable_id("------"));
    }

    #[test]
    fn test_record_emittable_by_basic_id() {
        let mut rec = RemoteIdRecord::new(provenance(Transport::WifiBeacon));
        rec.basic_id = Some(BasicId {
            uas_id_type: UasIdType::SerialNumber,
            uas_id: "DJI-TEST-001".into(),
        });
        assert!(rec.is_emittable());
    }

    #[test]
    fn test_record_emittable_by_position() {
        let mut rec = RemoteIdRecord::new(provenance(Transport::WifiBeacon));
        rec.location_vector = Some(LocationVector {
            latitude: Some(12.3585),
            longitude: Some(-1.5352),
            ..Default::default()
        });
        assert!(rec.is_emittable());
    }

    #[test]
    fn test_record_emittable_by_pattern() {
        let rec = RemoteIdRecord::new(provenance(Transport::PatternDetection));
        assert!(rec.is_emittable());
    }

    #[test]
    fn test_record_not_emittable_when_empty() {
        let rec = RemoteIdRecord::new(provenance(Transport::WifiBeacon));
        assert!(!rec.is_emittable());
    }
}
