//! Fused detection events and process-health messages, as published to the pub/sub
//! sink's four topics plus `system/health` (§6).
//!

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::frame::MacFrameKind;
use crate::remoteid::RemoteIdRecord;

/// Threat level bucket, from the §4.8 scoring rule.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, strum::Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

/// Result of applying the §4.8 threat-assessment rule set to one detection.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ThreatAssessment {
    pub score: i32,
    pub level: ThreatLevel,
    pub reasons: Vec<String>,
}

/// A fully enriched, ready-to-publish detection: the Remote ID record plus Orchestrator
/// provenance (monotonic id, transport, channel, gain) and the Threat/Fusion verdict.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DetectionEvent {
    /// Monotonic integer id assigned by the Orchestrator at emission time.
    pub id: u64,
    pub record: RemoteIdRecord,
    pub threat: Option<ThreatAssessment>,
    pub operator_distance_m: Option<f64>,
    pub zone_name: Option<String>,
}

/// Cumulative per-kind frame counters, reset only on process restart.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FrameCounters(pub BTreeMap<MacFrameKind, u64>);

impl FrameCounters {
    pub fn increment(&mut self, kind: MacFrameKind) {
        *self.0.entry(kind).or_insert(0) += 1;
    }

    pub fn get(&self, kind: MacFrameKind) -> u64 {
        *self.0.get(&kind).unwrap_or(&0)
    }
}

/// Heartbeat payload for `system/health`, published every 60s (§4.8) and as the
/// last-will message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HealthMessage {
    pub status: String,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,
    pub frame_counters: FrameCounters,
    pub detection_count: u64,
    pub dropped_block_count: u64,
}

impl HealthMessage {
    /// The last-will payload registered on connect (§6).
    pub fn last_will(client_id: &str) -> Self {
        Self {
            status: "disconnected_unexpectedly".into(),
            client_id: client_id.into(),
            timestamp: Utc::now(),
            frame_counters: FrameCounters::default(),
            detection_count: 0,
            dropped_block_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counters_increment() {
        let mut c = FrameCounters::default();
        c.increment(MacFrameKind::Beacon);
        c.increment(MacFrameKind::Beacon);
        c.increment(MacFrameKind::Data);
        assert_eq!(2, c.get(MacFrameKind::Beacon));
        assert_eq!(1, c.get(MacFrameKind::Data));
        assert_eq!(0, c.get(MacFrameKind::Control));
    }

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::Low < ThreatLevel::Medium);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
    }
}
