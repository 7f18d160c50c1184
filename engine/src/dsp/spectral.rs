//! Welch PSD estimation, peak-referenced bandwidth, and burst detection (§4.2).

use num_complex::Complex32;
use ridsentinel_types::{Burst, SpectralFeatures};
use rustfft::FftPlanner;

/// Welch-method configuration. Defaults match §4.2: 2048-sample segments, 50% overlap,
/// Hann window.
#[derive(Clone, Copy, Debug)]
pub struct SpectralConfig {
    pub segment_len: usize,
    pub overlap: f64,
    pub min_burst_duration_s: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            segment_len: 2048,
            overlap: 0.5,
            min_burst_duration_s: 0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralAnalyzer {
    pub config: SpectralConfig,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, samples: &[Complex32], sample_rate_hz: f64, center_freq_hz: u64) -> SpectralFeatures {
        let psd = self.welch_psd(samples);
        let freqs = fft_shift_frequencies(psd.len(), sample_rate_hz);

        let peak_db = psd.iter().copied().fold(f32::MIN, f32::max);
        let threshold_db = peak_db - 10.0;

        let (mut min_f, mut max_f) = (f64::MAX, f64::MIN);
        for (db, f) in psd.iter().zip(freqs.iter()) {
            if *db >= threshold_db {
                min_f = min_f.min(*f);
                max_f = max_f.max(*f);
            }
        }
        let bandwidth_hz = if max_f >= min_f { max_f - min_f } else { 0.0 };

        let (centroid, spread) = spectral_centroid_spread(&psd, &freqs);
        let flatness = spectral_flatness(&psd);

        let bursts = detect_bursts(samples, sample_rate_hz, self.config.min_burst_duration_s);

        SpectralFeatures {
            bandwidth_hz,
            center_freq_hz: center_freq_hz as f64,
            peak_power_db: peak_db,
            spectral_centroid_hz: centroid,
            spectral_spread_hz: spread,
            spectral_flatness: flatness,
            snr_db: 0.0,
            bursts,
        }
    }

    /// Two-sided Welch PSD in dB, DC-centered, averaged across overlapping Hann-windowed
    /// segments.
    fn welch_psd(&self, samples: &[Complex32]) -> Vec<f32> {
        let seg_len = self.config.segment_len.min(samples.len().max(1));
        if seg_len == 0 {
            return Vec::new();
        }
        let step = ((1.0 - self.config.overlap) * seg_len as f64).max(1.0) as usize;
        let window = hann_window(seg_len);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(seg_len);

        let mut accum = vec![0.0f64; seg_len];
        let mut segments = 0usize;

        let mut start = 0;
        while start + seg_len <= samples.len() {
            let mut buf: Vec<Complex32> = samples[start..start + seg_len]
                .iter()
                .zip(window.iter())
                .map(|(s, w)| *s * *w)
                .collect();
            fft.process(&mut buf);
            for (acc, c) in accum.iter_mut().zip(buf.iter()) {
                *acc += (c.norm_sqr()) as f64;
            }
            segments += 1;
            start += step;
        }

        if segments == 0 {
            let mut buf: Vec<Complex32> = samples
                .iter()
                .zip(window.iter().cycle())
                .map(|(s, w)| *s * *w)
                .collect();
            buf.resize(seg_len, Complex32::new(0.0, 0.0));
            fft.process(&mut buf);
            for (acc, c) in accum.iter_mut().zip(buf.iter()) {
                *acc += c.norm_sqr() as f64;
            }
            segments = 1;
        }

        let psd: Vec<f32> = accum
            .into_iter()
            .map(|p| 10.0 * ((p / segments as f64).max(1e-20)).log10() as f32)
            .collect();
        fft_shift(&psd)
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / (len - 1).max(1) as f32).cos())
        .collect()
}

fn fft_shift(psd: &[f32]) -> Vec<f32> {
    let mid = psd.len() / 2;
    let mut shifted = psd[mid..].to_vec();
    shifted.extend_from_slice(&psd[..mid]);
    shifted
}

fn fft_shift_frequencies(len: usize, sample_rate_hz: f64) -> Vec<f64> {
    (0..len)
        .map(|k| (k as f64 - (len / 2) as f64) * sample_rate_hz / len as f64)
        .collect()
}

fn spectral_centroid_spread(psd_db: &[f32], freqs: &[f64]) -> (f64, f64) {
    let linear: Vec<f64> = psd_db.iter().map(|db| 10f64.powf(*db as f64 / 10.0)).collect();
    let total: f64 = linear.iter().sum();
    if total == 0.0 {
        return (0.0, 0.0);
    }
    let centroid: f64 = linear.iter().zip(freqs.iter()).map(|(p, f)| p * f).sum::<f64>() / total;
    let spread: f64 = (linear
        .iter()
        .zip(freqs.iter())
        .map(|(p, f)| p * (f - centroid).powi(2))
        .sum::<f64>()
        / total)
        .sqrt();
    (centroid, spread)
}

/// Ratio of the geometric to the arithmetic mean of the PSD; near 1.0 for flat
/// (noise-like/OFDM) spectra, near 0 for peaky ones.
fn spectral_flatness(psd_db: &[f32]) -> f32 {
    let linear: Vec<f64> = psd_db.iter().map(|db| 10f64.powf(*db as f64 / 10.0).max(1e-20)).collect();
    if linear.is_empty() {
        return 0.0;
    }
    let log_sum: f64 = linear.iter().map(|p| p.ln()).sum();
    let geo_mean = (log_sum / linear.len() as f64).exp();
    let arith_mean = linear.iter().sum::<f64>() / linear.len() as f64;
    if arith_mean == 0.0 {
        return 0.0;
    }
    (geo_mean / arith_mean) as f32
}

/// A maximal run of instantaneous power above 3x the 25th-percentile noise floor,
/// lasting at least `min_duration_s`.
fn detect_bursts(samples: &[Complex32], sample_rate_hz: f64, min_duration_s: f64) -> Vec<Burst> {
    if samples.is_empty() {
        return Vec::new();
    }
    let power: Vec<f32> = samples.iter().map(|s| s.norm_sqr()).collect();

    let mut sorted = power.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let noise_floor = sorted[sorted.len() / 4];
    let threshold = 3.0 * noise_floor;

    let min_samples = (min_duration_s * sample_rate_hz).ceil() as usize;

    let mut bursts = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &p) in power.iter().enumerate() {
        if p > threshold {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            push_burst_if_long_enough(&mut bursts, &power, start, i - 1, sample_rate_hz, min_samples);
        }
    }
    if let Some(start) = run_start {
        push_burst_if_long_enough(&mut bursts, &power, start, power.len() - 1, sample_rate_hz, min_samples);
    }
    bursts
}

fn push_burst_if_long_enough(
    bursts: &mut Vec<Burst>,
    power: &[f32],
    start: usize,
    end: usize,
    sample_rate_hz: f64,
    min_samples: usize,
) {
    if end + 1 - start < min_samples.max(1) {
        return;
    }
    let mean_power = power[start..=end].iter().sum::<f32>() / (end + 1 - start) as f32;
    bursts.push(Burst {
        start_index: start,
        end_index: end,
        duration_s: (end + 1 - start) as f64 / sample_rate_hz,
        mean_power,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welch_psd_length_matches_segment() {
        let analyzer = SpectralAnalyzer::new(SpectralConfig {
            segment_len: 64,
            ..Default::default()
        });
        let samples: Vec<Complex32> = (0..256).map(|i| Complex32::new((i as f32).sin(), 0.0)).collect();
        let features = analyzer.analyze(&samples, 20_000_000.0, 2_412_000_000);
        assert!(features.bandwidth_hz >= 0.0);
    }

    #[test]
    fn test_burst_detection_finds_tone_burst() {
        let sample_rate = 20_000_000.0;
        let mut samples = vec![Complex32::new(0.0, 0.0); 4000];
        for s in samples.iter_mut().skip(1000).take(2000) {
            *s = Complex32::new(1.0, 0.0);
        }
        let bursts = detect_bursts(&samples, sample_rate, 0.00005);
        assert!(!bursts.is_empty());
        assert!(bursts[0].start_index >= 999 && bursts[0].start_index <= 1001);
    }

    #[test]
    fn test_flatness_is_bounded() {
        let psd = vec![-10.0f32; 32];
        let flatness = spectral_flatness(&psd);
        assert!((flatness - 1.0).abs() < 1e-4);
    }
}
