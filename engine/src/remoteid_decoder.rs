//! Walks ASTM F3411 message types inside an OpenDroneID VendorData blob, a BLE
//! advertisement payload, or an arbitrary byte window, and assembles a
//! [`RemoteIdRecord`] (§4.6). Structured parsing first; pattern fallback and a bounded
//! tolerance scan follow when the structured path yields nothing emittable.

use ridsentinel_types::{
    is_printable_id, Authentication, BasicId, LocationVector, OperationalStatus, OperatorId, Provenance, RemoteIdRecord,
    SelfId, SystemInfo, Transport, UasIdType,
};
use tracing::trace;

use crate::error::DecodeError;

const WIFI_TOLERANCE_WINDOW: usize = 128;
const BLE_TOLERANCE_WINDOW: usize = 64;

const PATTERN_PREFIXES: &[&[u8]] = &[
    b"DJI-RID-",
    b"MAVIC",
    b"MINI",
    b"AIR",
    b"FPV",
    &[0x0D, 0x00],
    &[0x25, 0x00],
    &[0x1A, 0x00],
    &[0xFA, 0x0B, 0xBC],
];

/// Decode one OpenDroneID VendorData blob (Wi-Fi path): structured pass, then pattern
/// fallback, then a bounded suffix-tolerance scan.
pub fn decode_wifi(data: &[u8], provenance: Provenance) -> Result<RemoteIdRecord, DecodeError> {
    decode(data, provenance, WIFI_TOLERANCE_WINDOW)
}

/// Decode a raw BLE service-data or manufacturer-data blob.
pub fn decode_ble(data: &[u8], provenance: Provenance) -> Result<RemoteIdRecord, DecodeError> {
    decode(data, provenance, BLE_TOLERANCE_WINDOW)
}

fn decode(data: &[u8], provenance: Provenance, tolerance_window: usize) -> Result<RemoteIdRecord, DecodeError> {
    let mut record = RemoteIdRecord::new(provenance.clone());
    walk_messages(data, &mut record);
    if record.is_emittable() {
        return Ok(record);
    }

    if let Some(record) = pattern_fallback(data, provenance.clone()) {
        return Ok(record);
    }

    if let Some(record) = tolerance_scan(data, provenance, tolerance_window) {
        return Ok(record);
    }

    Err(DecodeError::NoRecord)
}

/// Invariant 7: for Wi-Fi inputs at most the last 128 bytes are re-tried; for BLE, at
/// most the last 64. Each suffix is re-walked independently; the first emittable
/// record wins.
fn tolerance_scan(data: &[u8], provenance: Provenance, window: usize) -> Option<RemoteIdRecord> {
    let start = data.len().saturating_sub(window);
    for offset in start..data.len() {
        let mut record = RemoteIdRecord::new(provenance.clone());
        walk_messages(&data[offset..], &mut record);
        if record.is_emittable() {
            return Some(record);
        }
    }
    None
}

/// Scan for known authentic prefixes anywhere in the input; the first match wins.
fn pattern_fallback(data: &[u8], provenance: Provenance) -> Option<RemoteIdRecord> {
    for &prefix in PATTERN_PREFIXES {
        if let Some(pos) = find_subslice(data, prefix) {
            trace!("pattern fallback matched {:?} at {pos}", String::from_utf8_lossy(prefix));
            let mut record = RemoteIdRecord::new(Provenance { transport: Transport::PatternDetection, ..provenance });
            record.basic_id = Some(BasicId {
                uas_id_type: UasIdType::PatternDetection,
                uas_id: printable_string(&data[pos..(pos + 32).min(data.len())]),
            });
            return Some(record);
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len().max(1)).position(|w| w == needle)
}

/// Walk a sequence of one-byte-type-prefixed messages, populating whichever field
/// groups are recognized. Unrecognized or truncated messages stop the walk at that
/// point; whatever was already decoded is kept.
fn walk_messages(mut data: &[u8], record: &mut RemoteIdRecord) {
    while !data.is_empty() {
        let msg_type = data[0] & 0x0f;
        let rest = &data[1..];
        let consumed = match msg_type {
            0x0 => decode_basic_id(rest, record),
            0x1 => decode_location_vector(rest, record),
            0x2 => decode_authentication(rest, record),
            0x3 => decode_self_id(rest, record),
            0x4 => decode_system(rest, record),
            0x5 => decode_operator_id(rest, record),
            _ => None,
        };
        match consumed {
            Some(n) => data = &rest[n..],
            None => break,
        }
    }
}

fn decode_basic_id(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    // Tolerate both 21- and 23-byte variants (1 id-type + 20 id [+ 2 trailing zero]).
    let len = if data.len() >= 23 { 23 } else if data.len() >= 21 { 21 } else { return None };
    let uas_id_type = UasIdType::from_wire(data[0] & 0x0f);
    let uas_id = printable_string(&data[1..21]);
    record.basic_id = Some(BasicId { uas_id_type, uas_id });
    Some(len)
}

fn decode_location_vector(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    const MIN_LEN: usize = 16;
    if data.len() < MIN_LEN {
        return None;
    }
    let len = data.len().min(23);
    let status_byte = data[0];
    let status = if status_byte & 0x0f != 0 {
        OperationalStatus::Airborne
    } else {
        OperationalStatus::Ground
    };

    let direction_raw = data[1];
    let direction_deg = if direction_raw == 0xFF { None } else { Some(direction_raw as u16) };

    let speed_raw = data[2];
    let speed_mps = if speed_raw == 0xFF { None } else { Some(speed_raw as f32 * 0.25) };

    let vspeed_raw = data[3] as i8;
    let vertical_speed_mps = if vspeed_raw == 0x7F { None } else { Some(vspeed_raw as f32 * 0.5) };

    let lat_raw = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let lon_raw = i32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    let latitude = Some(lat_raw as f64 / 1e7);
    let longitude = Some(lon_raw as f64 / 1e7);

    let alt_raw = i16::from_le_bytes([data[12], data[13]]);
    let altitude_msl_m = decode_altitude(alt_raw);

    let height_raw = i16::from_le_bytes([data[14], data[15]]);
    let height_agl_m = decode_altitude(height_raw);

    record.location_vector = Some(LocationVector {
        status,
        direction_deg,
        speed_mps,
        vertical_speed_mps,
        latitude,
        longitude,
        altitude_msl_m,
        height_agl_m,
    });
    Some(len)
}

/// Altitude is encoded in 0.5 m units; the wire sentinel -1000 maps to "absent",
/// never to a literal number (invariant 4).
fn decode_altitude(raw: i16) -> Option<f32> {
    if raw == -1000 {
        None
    } else {
        Some(raw as f32 * 0.5)
    }
}

fn decode_authentication(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    if data.len() < 4 {
        return None;
    }
    let auth_type = data[0];
    let page_index = data[1];
    let last_page_index = data[2];
    let length = data[3] as usize;
    if data.len() < 4 + length {
        return None;
    }
    record.authentication = Some(Authentication {
        auth_type,
        page_index,
        last_page_index,
        payload: data[4..4 + length].to_vec(),
    });
    Some(4 + length)
}

fn decode_self_id(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    const LEN: usize = 24;
    if data.len() < LEN {
        return None;
    }
    record.self_id = Some(SelfId {
        description_type: data[0],
        description: printable_string(&data[1..LEN]),
    });
    Some(LEN)
}

fn decode_system(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    const LEN: usize = 3;
    if data.len() < LEN {
        return None;
    }
    record.system = Some(SystemInfo {
        operator_location_type: data[0],
        eu_class: data[1],
        category: data[2],
        operator_latitude: None,
        operator_longitude: None,
        operator_altitude_m: None,
    });
    Some(LEN)
}

fn decode_operator_id(data: &[u8], record: &mut RemoteIdRecord) -> Option<usize> {
    const LEN: usize = 21;
    if data.len() < LEN {
        return None;
    }
    record.operator_id = Some(OperatorId {
        id_type: data[0],
        operator_id: printable_string(&data[1..LEN]),
    });
    Some(LEN)
}

/// ASCII 0x20-0x7E, trailing NULs trimmed; falls back to uppercase hex of the original
/// bytes when fewer than half survive.
fn printable_string(bytes: &[u8]) -> String {
    let trimmed = trim_trailing_nuls(bytes);
    let printable: String = trimmed.iter().filter(|&&b| (0x20..=0x7e).contains(&b)).map(|&b| b as char).collect();

    if printable.len() * 2 >= trimmed.len().max(1) {
        printable
    } else {
        trimmed.iter().map(|b| format!("{b:02X}")).collect()
    }
}

fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn provenance() -> Provenance {
        Provenance {
            source_timestamp: Utc::now(),
            transport: Transport::WifiBeacon,
            source_address: None,
            center_freq_hz: None,
            gain_db: None,
        }
    }

    /// Scenario A.
    #[test]
    fn test_scenario_a_structured_basic_id() {
        let mut data = vec![0x00, 0x01];
        data.extend_from_slice(b"DJI-TEST-001");
        data.extend_from_slice(&[0u8; 8]);

        let record = decode_wifi(&data, provenance()).unwrap();
        let basic_id = record.basic_id.unwrap();
        assert_eq!("DJI-TEST-001", basic_id.uas_id);
        assert_eq!(UasIdType::SerialNumber, basic_id.uas_id_type);
        assert!(record.location_vector.is_none());
    }

    /// Scenario B.
    #[test]
    fn test_scenario_b_location_vector() {
        let mut data = vec![0x01, 0x57];
        data.push(87); // direction
        data.push(49); // speed 49*0.25 = 12.25
        data.push(5i8 as u8); // vspeed 5*0.5=2.5
        data.extend_from_slice(&123_585_000i32.to_le_bytes());
        data.extend_from_slice(&(-15_352_000i32).to_le_bytes());
        data.extend_from_slice(&241i16.to_le_bytes());
        data.extend_from_slice(&90i16.to_le_bytes());
        data.extend_from_slice(&[0u8; 5]);

        // Both lat and lon are present and non-zero, so the position acceptance
        // condition holds and the record decodes straight through.
        let record = decode_wifi(&data, provenance()).unwrap();
        let lv = record.location_vector.unwrap();
        assert_eq!(Some(87), lv.direction_deg);
        assert!((lv.speed_mps.unwrap() - 12.25).abs() < 1e-6);
        assert!((lv.vertical_speed_mps.unwrap() - 2.5).abs() < 1e-6);
        assert!((lv.latitude.unwrap() - 12.3585).abs() < 1e-6);
        assert!((lv.longitude.unwrap() - (-1.5352)).abs() < 1e-6);
        assert_eq!(Some(120.5), lv.altitude_msl_m);
        assert_eq!(Some(45.0), lv.height_agl_m);
        assert_eq!(OperationalStatus::Airborne, lv.status);
    }

    /// Scenario C.
    #[test]
    fn test_scenario_c_pattern_fallback() {
        let mut data = vec![0u8; 50];
        data.extend_from_slice(b"DJI-RID-MAVIC3PRO-12345");
        data.extend_from_slice(&[0u8; 50]);

        let record = decode_wifi(&data, provenance()).unwrap();
        assert_eq!(UasIdType::PatternDetection, record.basic_id.unwrap().uas_id_type);
        assert_eq!(Transport::PatternDetection, record.provenance.transport);
    }

    /// Scenario D.
    #[test]
    fn test_scenario_d_unknown_oui_yields_no_record() {
        // No ASTM message framing at all and no known pattern prefix.
        let data = vec![0x00, 0x50, 0xF2, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        assert!(decode_wifi(&data, provenance()).is_err());
    }

    #[test]
    fn test_idempotent_decode() {
        let mut data = vec![0x00, 0x01];
        data.extend_from_slice(b"DJI-TEST-001");
        data.extend_from_slice(&[0u8; 8]);

        let a = decode_wifi(&data, provenance()).unwrap();
        let b = decode_wifi(&data, provenance()).unwrap();
        assert_eq!(a.basic_id, b.basic_id);
    }

    #[test]
    fn test_altitude_sentinel_maps_to_none() {
        assert_eq!(None, decode_altitude(-1000));
        assert_eq!(Some(120.5), decode_altitude(241));
    }

    #[test]
    fn test_printable_string_falls_back_to_hex() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!("01020304", printable_string(&bytes));
    }

    #[test]
    fn test_is_printable_id_used_for_validity_filter() {
        assert!(is_printable_id("DJI-TEST-001"));
    }

    proptest! {
        #[test]
        fn decode_wifi_is_idempotent_on_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let p = provenance();
            let a = decode_wifi(&data, p.clone());
            let b = decode_wifi(&data, p);
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a.basic_id, b.basic_id);
                    prop_assert_eq!(a.location_vector, b.location_vector);
                }
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "decode was not idempotent: one call errored, the other didn't"),
            }
        }
    }
}
