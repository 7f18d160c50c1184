//! Parses 802.11 management-frame bodies and isolates Vendor-Specific Information
//! Elements (§4.5). Robust to truncation: an element whose length overruns the
//! remaining body stops parsing and returns whatever completed cleanly.

use ridsentinel_types::MacFrameKind;

use crate::error::FrameParseError;

const OPENDRONEID_OUI: [u8; 3] = [0xFA, 0x0B, 0xBC];
const VENDOR_SPECIFIC_ELEMENT_ID: u8 = 0xDD;

const FRAME_CONTROL_BEACON: u8 = 0b1000_0000;
const FRAME_CONTROL_ACTION: u8 = 0b1101_0000;
const FRAME_CONTROL_PROBE_RESP: u8 = 0b0101_0000;
const FRAME_TYPE_DATA_MASK: u8 = 0b0000_1000;
const FRAME_TYPE_CONTROL_MASK: u8 = 0b0000_0100;

/// One parsed (ElementID, Value) pair from the element stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InformationElement {
    pub id: u8,
    pub value: Vec<u8>,
}

/// Result of parsing one frame body: its MAC-frame class plus the OpenDroneID
/// VendorData blobs found inside `0xDD` elements whose OUI matched `FA-0B-BC`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFrame {
    pub kind: MacFrameKind,
    pub vendor_data: Vec<Vec<u8>>,
}

/// Classify a frame from its first control byte (§4.5 assumes 802.11 frame-control
/// conventions for Beacon/Action/Probe-Response/Data/Control).
pub fn classify_frame_control(frame_control: u8) -> MacFrameKind {
    match frame_control {
        FRAME_CONTROL_BEACON => MacFrameKind::Beacon,
        FRAME_CONTROL_ACTION => MacFrameKind::Action,
        FRAME_CONTROL_PROBE_RESP => MacFrameKind::ProbeResponse,
        fc if fc & FRAME_TYPE_DATA_MASK != 0 => MacFrameKind::Data,
        fc if fc & FRAME_TYPE_CONTROL_MASK != 0 => MacFrameKind::Control,
        _ => MacFrameKind::Other,
    }
}

/// Parse a Beacon body: 8-byte timestamp, 2-byte interval, 2-byte capability, then
/// the element stream.
pub fn parse_beacon_body(body: &[u8]) -> Result<ParsedFrame, FrameParseError> {
    const FIXED_HEADER: usize = 12;
    if body.len() < FIXED_HEADER {
        return Err(FrameParseError::Truncated { needed: FIXED_HEADER, got: body.len() });
    }
    Ok(parse_element_stream(&body[FIXED_HEADER..], MacFrameKind::Beacon))
}

/// Parse an Action or NAN body: category + action bytes, then the element stream.
pub fn parse_action_body(body: &[u8]) -> Result<ParsedFrame, FrameParseError> {
    const FIXED_HEADER: usize = 2;
    if body.len() < FIXED_HEADER {
        return Err(FrameParseError::Truncated { needed: FIXED_HEADER, got: body.len() });
    }
    Ok(parse_element_stream(&body[FIXED_HEADER..], MacFrameKind::Action))
}

/// Walk a (ElementID, Length, Value) triple stream, collecting Vendor-Specific
/// elements whose OUI matches OpenDroneID's. Stops cleanly on the first overrun
/// rather than erroring: whatever vendor data was already found is still returned.
fn parse_element_stream(mut rest: &[u8], kind: MacFrameKind) -> ParsedFrame {
    let mut vendor_data = Vec::new();

    while rest.len() >= 2 {
        let id = rest[0];
        let len = rest[1] as usize;
        if rest.len() < 2 + len {
            break;
        }
        let value = &rest[2..2 + len];

        if id == VENDOR_SPECIFIC_ELEMENT_ID && value.len() >= 4 && value[0..3] == OPENDRONEID_OUI {
            vendor_data.push(value[4..].to_vec());
        }

        rest = &rest[2 + len..];
    }

    ParsedFrame { kind, vendor_data }
}

/// Extract every `0xDD` element's raw `(OUI, VendorType, VendorData)` tuple,
/// regardless of OUI — used by tests and diagnostics; production code should prefer
/// [`parse_beacon_body`]/[`parse_action_body`], which filter to OpenDroneID directly.
pub fn vendor_specific_elements(body: &[u8]) -> Vec<InformationElement> {
    let mut rest = body;
    let mut out = Vec::new();
    while rest.len() >= 2 {
        let id = rest[0];
        let len = rest[1] as usize;
        if rest.len() < 2 + len {
            break;
        }
        if id == VENDOR_SPECIFIC_ELEMENT_ID {
            out.push(InformationElement { id, value: rest[2..2 + len].to_vec() });
        }
        rest = &rest[2 + len..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: u8, value: &[u8]) -> Vec<u8> {
        let mut v = vec![id, value.len() as u8];
        v.extend_from_slice(value);
        v
    }

    #[test]
    fn test_vendor_specific_opendroneid_is_captured() {
        let mut value = OPENDRONEID_OUI.to_vec();
        value.push(0x0D); // VendorType
        value.extend_from_slice(b"hello");
        let body = element(VENDOR_SPECIFIC_ELEMENT_ID, &value);

        let mut frame_body = vec![0u8; 12];
        frame_body.extend_from_slice(&body);

        let parsed = parse_beacon_body(&frame_body).unwrap();
        assert_eq!(1, parsed.vendor_data.len());
        assert_eq!(b"hello".to_vec(), parsed.vendor_data[0]);
    }

    #[test]
    fn test_unknown_oui_is_dropped() {
        let mut value = vec![0x00, 0x50, 0xF2, 0x01];
        value.extend_from_slice(b"msft");
        let body = element(VENDOR_SPECIFIC_ELEMENT_ID, &value);

        let mut frame_body = vec![0u8; 12];
        frame_body.extend_from_slice(&body);

        let parsed = parse_beacon_body(&frame_body).unwrap();
        assert!(parsed.vendor_data.is_empty());
    }

    #[test]
    fn test_length_overrun_stops_cleanly() {
        let mut frame_body = vec![0u8; 12];
        frame_body.extend_from_slice(&[VENDOR_SPECIFIC_ELEMENT_ID, 200, 0x01, 0x02]);
        let parsed = parse_beacon_body(&frame_body).unwrap();
        assert!(parsed.vendor_data.is_empty());
    }

    #[test]
    fn test_truncated_fixed_header_errors() {
        assert!(parse_beacon_body(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_classify_frame_control() {
        assert_eq!(MacFrameKind::Beacon, classify_frame_control(FRAME_CONTROL_BEACON));
        assert_eq!(MacFrameKind::Action, classify_frame_control(FRAME_CONTROL_ACTION));
    }
}
