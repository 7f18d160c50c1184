//! Spectral features and burst detection results produced by the Spectral Analyzer.
//!

use serde::{Deserialize, Serialize};

/// A maximal run of instantaneous power above the burst-detector threshold.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Burst {
    pub start_index: usize,
    pub end_index: usize,
    /// Seconds.
    pub duration_s: f64,
    pub mean_power: f32,
}

/// Per-block spectral summary. Discarded after classification unless attached to a
/// detection event for diagnostics.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SpectralFeatures {
    pub bandwidth_hz: f64,
    pub center_freq_hz: f64,
    pub peak_power_db: f32,
    pub spectral_centroid_hz: f64,
    pub spectral_spread_hz: f64,
    pub spectral_flatness: f32,
    pub snr_db: f32,
    pub bursts: Vec<Burst>,
}

/// Verdict of the Wi-Fi Classifier: is this block plausibly 802.11 OFDM, at what
/// confidence, and on which channel.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct WifiClassification {
    pub is_wifi: bool,
    pub confidence: f32,
    pub channel: Option<u8>,
}
