//! No-op stand-ins for the two external collaborators this system treats as opaque
//! interfaces (§1): the SDR Sample Source and the BLE adapter. Wiring a physical
//! device behind either trait is outside this repo's scope; these exist so the
//! Orchestrator's actor graph, heartbeat and shutdown path have something to drive.

use std::time::Duration;

use eyre::{eyre, Result};
use ridsentinel_engine::ble::{Advertisement, BleSource};
use ridsentinel_engine::orchestrator::SampleSource;

/// Always refuses to initialize, so callers exercise the §7 hardware-fatal /
/// BLE-only fallback path rather than silently pretending to stream samples.
#[derive(Default)]
pub struct NullSampleSource;

#[async_trait::async_trait]
impl SampleSource for NullSampleSource {
    async fn initialize(&mut self, _device_args: &str, _sample_rate_hz: f64, _center_freq_hz: u64, _gain_db: f32, _antenna: &str) -> Result<()> {
        Err(eyre!("no Sample Source driver linked into this build"))
    }

    async fn set_center_freq(&mut self, _freq_hz: u64, _channel: u16) -> Result<()> {
        Err(eyre!("no Sample Source driver linked into this build"))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sleeps out the scan window and reports no advertisements. A real adapter
/// (e.g. a `btleplug` central) would return whatever it collected in that window.
#[derive(Default)]
pub struct NullBleSource;

#[async_trait::async_trait]
impl BleSource for NullBleSource {
    async fn scan(&self, window: Duration) -> Result<Vec<Advertisement>> {
        tokio::time::sleep(window).await;
        Ok(Vec::new())
    }
}
