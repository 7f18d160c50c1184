//! Weighted-vote Wi-Fi classifier: from spectral features alone, decide whether a
//! block is plausibly 802.11 OFDM (§4.3).

use ridsentinel_types::{Burst, SpectralFeatures, WifiClassification};

const CONFIDENCE_THRESHOLD: f32 = 0.6;
const BEACON_INTERVALS_MS: [f64; 4] = [100.0, 102.4, 200.0, 204.8];
const BEACON_TOLERANCE_MS: f64 = 20.0;

pub fn classify(features: &SpectralFeatures, center_freq_hz: u64) -> WifiClassification {
    let (freq_score, channel) = frequency_match(center_freq_hz);
    let bw_score = bandwidth_match(features.bandwidth_hz);
    let flatness_score = flatness_match(features.spectral_flatness);

    let confidence = 0.4 * freq_score + 0.3 * bw_score + 0.3 * flatness_score;

    WifiClassification {
        is_wifi: confidence >= CONFIDENCE_THRESHOLD,
        confidence,
        channel,
    }
}

/// Within ±5 MHz of a 2.4 GHz channel center (1-11, 5 MHz spacing from 2.412 GHz);
/// confidence decays linearly with offset.
fn frequency_match(center_freq_hz: u64) -> (f32, Option<u8>) {
    let freq_mhz = center_freq_hz as f64 / 1_000_000.0;
    let mut best: Option<(u8, f64)> = None;
    for ch in 1u8..=11 {
        let center = 2412.0 + 5.0 * (ch as f64 - 1.0);
        let offset = (freq_mhz - center).abs();
        if offset <= 5.0 && best.map(|(_, o)| offset < o).unwrap_or(true) {
            best = Some((ch, offset));
        }
    }
    match best {
        Some((ch, offset)) => ((1.0 - offset / 5.0) as f32, Some(ch)),
        None => (0.0, None),
    }
}

fn bandwidth_match(bandwidth_hz: f64) -> f32 {
    let mhz = bandwidth_hz / 1_000_000.0;
    if (18.0..=22.0).contains(&mhz) || (38.0..=42.0).contains(&mhz) {
        1.0
    } else if (10.0..=25.0).contains(&mhz) {
        0.7
    } else {
        0.0
    }
}

fn flatness_match(flatness: f32) -> f32 {
    if (0.3..=0.7).contains(&flatness) {
        1.0
    } else if (0.2..=0.8).contains(&flatness) {
        0.5
    } else {
        0.0
    }
}

/// True when the mean inter-burst interval falls within ±20ms of a known beacon
/// period (100, 102.4, 200, 204.8 ms).
pub fn detect_beacon_frames(bursts: &[Burst], sample_rate_hz: f64) -> bool {
    if bursts.len() < 2 {
        return false;
    }
    let starts_s: Vec<f64> = bursts.iter().map(|b| b.start_index as f64 / sample_rate_hz).collect();
    let intervals_ms: Vec<f64> = starts_s.windows(2).map(|w| (w[1] - w[0]) * 1000.0).collect();
    let mean_ms = intervals_ms.iter().sum::<f64>() / intervals_ms.len() as f64;

    BEACON_INTERVALS_MS.iter().any(|&expected| (mean_ms - expected).abs() <= BEACON_TOLERANCE_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(bandwidth_hz: f64, flatness: f32) -> SpectralFeatures {
        SpectralFeatures {
            bandwidth_hz,
            spectral_flatness: flatness,
            ..Default::default()
        }
    }

    #[test]
    fn test_strong_wifi_classification() {
        let f = features(20_000_000.0, 0.5);
        let verdict = classify(&f, 2_412_000_000);
        assert!(verdict.is_wifi);
        assert_eq!(Some(1), verdict.channel);
    }

    #[test]
    fn test_off_channel_frequency_fails() {
        let f = features(20_000_000.0, 0.5);
        let verdict = classify(&f, 2_500_000_000);
        assert!(!verdict.is_wifi);
        assert_eq!(None, verdict.channel);
    }

    #[test]
    fn test_beacon_interval_detected() {
        let sample_rate = 20_000_000.0;
        let bursts = vec![
            Burst { start_index: 0, end_index: 10, duration_s: 0.0, mean_power: 1.0 },
            Burst { start_index: (0.1 * sample_rate) as usize, end_index: 10, duration_s: 0.0, mean_power: 1.0 },
            Burst { start_index: (0.2 * sample_rate) as usize, end_index: 10, duration_s: 0.0, mean_power: 1.0 },
        ];
        assert!(detect_beacon_frames(&bursts, sample_rate));
    }
}
