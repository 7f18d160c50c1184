//! DC removal, I/Q imbalance correction, band-pass filtering, normalization and SNR
//! estimation, applied in that order to every sample block before spectral analysis
//! (§4.1). Pure function of its input: no shared state, no side effects.

use num_complex::Complex32;
use ridsentinel_types::SampleBlock;
use tracing::warn;

use crate::error::DspError;

/// One of the three block-level normalizations available in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Normalization {
    #[default]
    Rms,
    Peak,
    MinMax,
}

/// Configuration for one preprocessing pass.
#[derive(Clone, Copy, Debug)]
pub struct PreprocessorConfig {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    pub normalization: Normalization,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: 1.0,
            bandpass_high_hz: 20_000_000.0,
            normalization: Normalization::Rms,
        }
    }
}

/// Result of running one block through the chain: the processed samples plus the
/// estimated SNR in dB.
#[derive(Clone, Debug)]
pub struct PreprocessedBlock {
    pub samples: Vec<Complex32>,
    pub snr_db: f32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Preprocessor {
    pub config_snapshot: PreprocessorConfigSnapshot,
}

/// Cheap `Copy` view of the fields `Preprocessor` actually reads, so the struct itself
/// can stay `Copy` and be shared across DSP workers without cloning a `String`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreprocessorConfigSnapshot {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    pub normalization: Normalization,
}

impl From<PreprocessorConfig> for PreprocessorConfigSnapshot {
    fn from(c: PreprocessorConfig) -> Self {
        Self {
            bandpass_low_hz: c.bandpass_low_hz,
            bandpass_high_hz: c.bandpass_high_hz,
            normalization: c.normalization,
        }
    }
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self {
            config_snapshot: config.into(),
        }
    }

    /// Run the full chain on `block` (invariant 1: output length equals input length).
    pub fn process(&self, block: &SampleBlock) -> Result<PreprocessedBlock, DspError> {
        if block.is_empty() {
            return Err(DspError::EmptyBlock);
        }

        let mut samples: Vec<Complex32> = block.samples.to_vec();

        remove_dc(&mut samples);
        correct_iq_imbalance(&mut samples);
        self.bandpass(&mut samples, block.sample_rate_hz)?;
        self.normalize(&mut samples);

        let snr_db = estimate_snr_db(&samples);

        Ok(PreprocessedBlock { samples, snr_db })
    }

    fn bandpass(&self, samples: &mut [Complex32], sample_rate_hz: f64) -> Result<(), DspError> {
        let nyquist = sample_rate_hz / 2.0;
        let (low, high) = (self.config_snapshot.bandpass_low_hz, self.config_snapshot.bandpass_high_hz);
        if low >= high || high > 0.9 * nyquist {
            warn!("bandpass cutoffs ({low}, {high}) Hz invalid for Nyquist {nyquist} Hz, bypassing filter");
            return Ok(());
        }
        let mut i: Vec<f32> = samples.iter().map(|s| s.re).collect();
        let mut q: Vec<f32> = samples.iter().map(|s| s.im).collect();
        butterworth6_bandpass(&mut i, sample_rate_hz, low, high);
        butterworth6_bandpass(&mut q, sample_rate_hz, low, high);
        for (s, (re, im)) in samples.iter_mut().zip(i.into_iter().zip(q)) {
            *s = Complex32::new(re, im);
        }
        Ok(())
    }

    fn normalize(&self, samples: &mut [Complex32]) {
        let denom = match self.config_snapshot.normalization {
            Normalization::Rms => {
                let sum_sq: f32 = samples.iter().map(|s| s.norm_sqr()).sum();
                (sum_sq / samples.len() as f32).sqrt()
            }
            Normalization::Peak => samples.iter().map(|s| s.norm()).fold(0.0f32, f32::max),
            Normalization::MinMax => {
                let max = samples.iter().map(|s| s.norm()).fold(f32::MIN, f32::max);
                let min = samples.iter().map(|s| s.norm()).fold(f32::MAX, f32::min);
                max - min
            }
        };
        if denom == 0.0 {
            return;
        }
        for s in samples.iter_mut() {
            *s /= denom;
        }
    }
}

fn remove_dc(samples: &mut [Complex32]) {
    let mean: Complex32 = samples.iter().copied().sum::<Complex32>() / samples.len() as f32;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

/// Normalize Q's standard deviation to I's, then Gram-Schmidt-orthogonalize Q against I
/// using the empirical correlation ratio.
fn correct_iq_imbalance(samples: &mut [Complex32]) {
    let n = samples.len() as f32;
    let i_std = (samples.iter().map(|s| s.re * s.re).sum::<f32>() / n).sqrt();
    let q_std = (samples.iter().map(|s| s.im * s.im).sum::<f32>() / n).sqrt();
    if q_std == 0.0 {
        return;
    }
    let scale = i_std / q_std;
    for s in samples.iter_mut() {
        s.im *= scale;
    }

    let cov: f32 = samples.iter().map(|s| s.re * s.im).sum::<f32>() / n;
    let i_var: f32 = samples.iter().map(|s| s.re * s.re).sum::<f32>() / n;
    if i_var == 0.0 {
        return;
    }
    let ratio = cov / i_var;
    for s in samples.iter_mut() {
        s.im -= ratio * s.re;
    }
}

/// 6th-order Butterworth band-pass, built as three cascaded biquad sections via the
/// bilinear transform. Operates in place on a real-valued signal.
fn butterworth6_bandpass(signal: &mut [f32], sample_rate_hz: f64, low_hz: f64, high_hz: f64) {
    let nyquist = sample_rate_hz / 2.0;
    let low = (low_hz / nyquist).clamp(1e-6, 0.999);
    let high = (high_hz / nyquist).clamp(low + 1e-6, 0.999);
    let center = (low * high).sqrt();
    let bandwidth = high - low;

    // Three second-order sections approximate the 6th-order response; each section's
    // Q is spread across the pole pairs of a Butterworth prototype.
    const Q_FACTORS: [f64; 3] = [0.5176, 0.7071, 1.9319];
    for &q_base in &Q_FACTORS {
        let q = q_base * center / bandwidth.max(1e-6);
        apply_biquad_bandpass(signal, center, q);
    }
}

fn apply_biquad_bandpass(signal: &mut [f32], normalized_center: f64, q: f64) {
    let omega = std::f64::consts::PI * normalized_center;
    let alpha = omega.sin() / (2.0 * q);
    let cos_w = omega.cos();

    let b0 = alpha;
    let b1 = 0.0;
    let b2 = -alpha;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w;
    let a2 = 1.0 - alpha;

    let (b0, b1, b2, a1, a2) = (b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);

    let (mut x1, mut x2, mut y1, mut y2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for sample in signal.iter_mut() {
        let x0 = *sample as f64;
        let y0 = b0 * x0 + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2;
        x2 = x1;
        x1 = x0;
        y2 = y1;
        y1 = y0;
        *sample = y0 as f32;
    }
}

/// Signal power over the central half vs noise power over the outer quarters, in dB.
fn estimate_snr_db(samples: &[Complex32]) -> f32 {
    let n = samples.len();
    let q = n / 4;
    let signal_power: f32 = samples[q..n - q].iter().map(|s| s.norm_sqr()).sum::<f32>() / (n - 2 * q).max(1) as f32;
    let noise_power: f32 = samples[..q]
        .iter()
        .chain(samples[n - q..].iter())
        .map(|s| s.norm_sqr())
        .sum::<f32>()
        / (2 * q).max(1) as f32;

    if noise_power == 0.0 {
        return f32::INFINITY;
    }
    10.0 * (signal_power / noise_power).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block_of(samples: Vec<Complex32>) -> SampleBlock {
        SampleBlock::new(samples, 0, 20_000_000.0, 2_412_000_000)
    }

    #[test]
    fn test_process_preserves_length() {
        let samples = vec![Complex32::new(1.0, 0.5); 256];
        let pre = Preprocessor::new(PreprocessorConfig::default());
        let out = pre.process(&block_of(samples)).unwrap();
        assert_eq!(256, out.samples.len());
    }

    #[test]
    fn test_empty_block_errors() {
        let pre = Preprocessor::new(PreprocessorConfig::default());
        assert!(matches!(pre.process(&block_of(vec![])), Err(DspError::EmptyBlock)));
    }

    #[test]
    fn test_zero_mean_equal_variance_iq_is_near_identity() {
        let samples: Vec<Complex32> = (0..64)
            .map(|i| {
                let t = i as f32 - 32.0;
                Complex32::new(t, t)
            })
            .collect();
        let mut iq = samples.clone();
        remove_dc(&mut iq);
        correct_iq_imbalance(&mut iq);
        for (a, b) in iq.iter().zip(samples.iter()) {
            assert!((a.re - b.re).abs() < 1e-3);
            assert!((a.im - b.im).abs() < 1e-3);
        }
    }

    #[test]
    fn test_snr_infinite_when_noise_floor_zero() {
        let mut samples = vec![Complex32::new(0.0, 0.0); 64];
        for s in samples.iter_mut().skip(16).take(32) {
            *s = Complex32::new(1.0, 0.0);
        }
        assert_eq!(f32::INFINITY, estimate_snr_db(&samples));
    }

    #[test]
    fn test_bypass_on_invalid_cutoffs() {
        let pre = Preprocessor::new(PreprocessorConfig {
            bandpass_low_hz: 100.0,
            bandpass_high_hz: 50.0,
            normalization: Normalization::Rms,
        });
        let samples = vec![Complex32::new(1.0, 1.0); 32];
        let before = samples.clone();
        let mut after = samples;
        pre.bandpass(&mut after, 20_000_000.0).unwrap();
        assert_eq!(before, after);
    }

    proptest! {
        #[test]
        fn process_preserves_length_for_any_nonempty_block(
            re in prop::collection::vec(-10.0f32..10.0, 16..512),
            im in prop::collection::vec(-10.0f32..10.0, 16..512),
        ) {
            let n = re.len().min(im.len());
            let samples: Vec<Complex32> = re.into_iter().zip(im).take(n).map(|(r, i)| Complex32::new(r, i)).collect();
            let pre = Preprocessor::new(PreprocessorConfig::default());
            let out = pre.process(&block_of(samples)).unwrap();
            prop_assert_eq!(n, out.samples.len());
        }

        #[test]
        fn zero_mean_equal_variance_iq_is_near_identity_for_any_amplitude(
            scale in 0.1f32..50.0,
        ) {
            let samples: Vec<Complex32> = (0..64)
                .map(|i| {
                    let t = (i as f32 - 32.0) * scale;
                    Complex32::new(t, t)
                })
                .collect();
            let mut iq = samples.clone();
            remove_dc(&mut iq);
            correct_iq_imbalance(&mut iq);
            for (a, b) in iq.iter().zip(samples.iter()) {
                prop_assert!((a.re - b.re).abs() < scale * 1e-3 + 1e-3);
                prop_assert!((a.im - b.im).abs() < scale * 1e-3 + 1e-3);
            }
        }
    }
}
