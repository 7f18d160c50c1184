//! The Orchestrator: channel-hopping plan, worker lifecycles, record merging,
//! heartbeat, threat assessment, and emission to pub/sub (§4.8, §5).

pub use threat::{assess, ThreatInput, ThreatLimits};

mod threat;
pub mod pubsub;

use std::time::Duration;

use eyre::Result;
use ridsentinel_common::GeofenceZone;
use ridsentinel_types::{ChannelPlan, DetectionEvent, FrameCounters, HealthMessage, RemoteIdRecord};
use tracing::trace;

/// §6: the Sample Source interface. Owned exclusively by the Sample worker; only the
/// Hopper sends retune commands, and only across a single-reader single-writer channel.
#[async_trait::async_trait]
pub trait SampleSource: Send {
    async fn initialize(&mut self, device_args: &str, sample_rate_hz: f64, center_freq_hz: u64, gain_db: f32, antenna: &str) -> Result<()>;
    async fn set_center_freq(&mut self, freq_hz: u64, channel: u16) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Dwell time for a channel-hop cycle: a full scan gets more time per channel than a
/// short, user-specified plan (§4.8).
pub fn dwell_for_plan(plan: &ChannelPlan) -> Duration {
    if plan.len() > 4 {
        Duration::from_secs(7)
    } else {
        Duration::from_secs(2)
    }
}

/// Drives the hop loop: the next channel to retune to, given the plan and the index
/// of the channel just vacated. Wraps around at the end of the plan.
pub struct Hopper {
    pub plan: ChannelPlan,
    pub dwell: Duration,
    pub index: usize,
}

impl Hopper {
    pub fn new(plan: ChannelPlan) -> Self {
        let dwell = dwell_for_plan(&plan);
        Self { plan, dwell, index: 0 }
    }

    /// The next channel to retune to; `None` if the plan is empty.
    pub fn next_channel(&mut self) -> Option<ridsentinel_types::PlanChannel> {
        if self.plan.is_empty() {
            return None;
        }
        let channel = self.plan.channels[self.index];
        self.index = (self.index + 1) % self.plan.len();
        Some(channel)
    }
}

/// Assigns monotonic integer ids to detection events at emission time (§5 ordering
/// guarantee). A single counter shared by both the Wi-Fi and BLE ingestion paths.
#[derive(Debug, Default)]
pub struct DetectionIdAllocator {
    next: u64,
}

impl DetectionIdAllocator {
    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Merge a decoded Remote ID record into a fully enriched detection event: attach a
/// monotonic id, run Threat/Fusion, and attach provenance already present on the
/// record (§4.8 merging: Wi-Fi and BLE records are emitted independently, the
/// Orchestrator only attaches transport/channel/gain/timestamp and the threat verdict).
pub fn enrich(record: RemoteIdRecord, id: u64, zones: &[GeofenceZone], limits: ThreatLimits, operator_location: Option<(f64, f64)>) -> DetectionEvent {
    let input = ThreatInput {
        location: record.location_vector.as_ref(),
        operator_location,
        has_remote_id: record.basic_id.is_some() || record.location_vector.is_some(),
        classifier_invalid: false,
    };
    let (assessment, operator_distance_m, zone_name) = assess(&input, zones, limits);

    DetectionEvent {
        id,
        record,
        threat: Some(assessment),
        operator_distance_m,
        zone_name,
    }
}

/// Build the §4.8 heartbeat payload from the accumulated counters.
pub fn heartbeat(client_id: &str, frame_counters: FrameCounters, detection_count: u64, dropped_block_count: u64) -> HealthMessage {
    trace!("building heartbeat for {client_id}");
    HealthMessage {
        status: "running".to_string(),
        client_id: client_id.to_string(),
        timestamp: chrono::Utc::now(),
        frame_counters,
        detection_count,
        dropped_block_count,
    }
}

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hopper_wraps_around() {
        let plan = ChannelPlan::parse("1,6,11").unwrap();
        let mut hopper = Hopper::new(plan);
        let first = hopper.next_channel().unwrap().channel;
        hopper.next_channel();
        hopper.next_channel();
        let wrapped = hopper.next_channel().unwrap().channel;
        assert_eq!(first, wrapped);
    }

    #[test]
    fn test_short_plan_gets_short_dwell() {
        let plan = ChannelPlan::parse("1,6,11").unwrap();
        assert_eq!(Duration::from_secs(2), dwell_for_plan(&plan));
    }

    #[test]
    fn test_full_scan_gets_long_dwell() {
        let plan = ChannelPlan::parse("all").unwrap();
        assert_eq!(Duration::from_secs(7), dwell_for_plan(&plan));
    }

    #[test]
    fn test_detection_ids_are_monotonic() {
        let mut alloc = DetectionIdAllocator::default();
        assert_eq!(0, alloc.allocate());
        assert_eq!(1, alloc.allocate());
        assert_eq!(2, alloc.allocate());
    }
}
