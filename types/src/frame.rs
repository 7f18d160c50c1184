//! Candidate MAC frames, as emitted by the OFDM Receiver or the BLE Ingestor.
//!

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 802.11 frame classes the Orchestrator counts for the heartbeat (§4.8).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MacFrameKind {
    Beacon,
    Action,
    ProbeResponse,
    Data,
    Control,
    #[default]
    Other,
}

/// A byte vector plus capture metadata. Produced once, consumed once by the
/// Remote ID Decoder.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CandidateMacFrame {
    pub bytes: Vec<u8>,
    pub kind: MacFrameKind,
    pub rssi_dbm: Option<f32>,
    pub channel: Option<u8>,
    pub captured_at: DateTime<Utc>,
    pub source_mac: Option<String>,
}
