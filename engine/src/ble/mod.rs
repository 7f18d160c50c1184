//! The BLE Ingestor: consumes a continuous advertisement stream and offers both
//! `service_data` and `manufacturer_data` payloads to the Remote ID Decoder (§4.7).
//! The underlying adapter is single-threaded, so scanning runs as a cooperative task
//! loop on its own dedicated thread (§9 design note), restarted with exponential
//! backoff bounded at 1s-30s on adapter error.

pub use actors::{BleSource, BleWorker, BleWorkerMsg, BleWorkerState};

mod actors;

use chrono::{DateTime, Utc};

/// One BLE advertisement event as delivered by the adapter.
#[derive(Clone, Debug)]
pub struct Advertisement {
    pub address: String,
    pub service_data: Option<Vec<u8>>,
    pub manufacturer_data: Option<Vec<u8>>,
    pub rssi_dbm: Option<f32>,
    pub seen_at: DateTime<Utc>,
}

/// Minimum payload length the Remote ID Decoder is offered a blob for (§4.7).
pub const MIN_PAYLOAD_LEN: usize = 5;

impl Advertisement {
    /// Payload blobs worth handing to the decoder, in the order the contract
    /// prescribes: service-data first, then manufacturer-data.
    pub fn candidate_payloads(&self) -> Vec<&[u8]> {
        [self.service_data.as_deref(), self.manufacturer_data.as_deref()]
            .into_iter()
            .flatten()
            .filter(|b| b.len() >= MIN_PAYLOAD_LEN)
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    pub min_delay_s: u64,
    pub max_delay_s: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { min_delay_s: 1, max_delay_s: 30 }
    }
}

impl BackoffPolicy {
    /// Exponential backoff, doubling per consecutive failure, clamped to the bound.
    pub fn delay_for(&self, consecutive_failures: u32) -> std::time::Duration {
        let secs = self.min_delay_s.saturating_mul(1u64 << consecutive_failures.min(8)).min(self.max_delay_s);
        std::time::Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_payloads_filters_short_blobs() {
        let ad = Advertisement {
            address: "AA:BB".into(),
            service_data: Some(vec![1, 2]),
            manufacturer_data: Some(vec![1, 2, 3, 4, 5, 6]),
            rssi_dbm: None,
            seen_at: Utc::now(),
        };
        let payloads = ad.candidate_payloads();
        assert_eq!(1, payloads.len());
    }

    #[test]
    fn test_backoff_clamped_at_30s() {
        let policy = BackoffPolicy::default();
        assert_eq!(std::time::Duration::from_secs(1), policy.delay_for(0));
        assert_eq!(std::time::Duration::from_secs(30), policy.delay_for(10));
    }
}
