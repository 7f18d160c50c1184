//! OFDM Receiver: the throughput-critical, algorithmically deep stage of the RF-to-frame
//! pipeline (§4.4). Runs SEARCH → COARSE-SYNC → FINE-SYNC → CHANNEL-EST → DEMOD →
//! ASSEMBLE per block, emitting zero or more candidate MAC frames in preamble-detection
//! order. Never interleaves bytes of two frames (the ordering guarantee).

use std::f32::consts::PI;

use chrono::Utc;
use num_complex::Complex32;
use ridsentinel_types::{CandidateMacFrame, MacFrameKind};
use rustfft::FftPlanner;
use tracing::debug;

use crate::error::DspError;

const STS_REPEAT_LEN: usize = 16;
const STS_MIN_REPEATS: usize = 10;
const STS_CORR_THRESHOLD: f32 = 0.56;
const STS_HOLD_SAMPLES: usize = 16;
const LTS_LEN: usize = 64;
const LTS_SEARCH_WINDOW: usize = 320;
const CP_LEN: usize = 16;
const SYMBOL_LEN: usize = CP_LEN + LTS_LEN;
const DATA_SUBCARRIERS: usize = 48;
const EQUALIZER_CONDITION_THRESHOLD: f32 = 50.0;

/// The 64-point frequency-domain long-training sequence defined by 802.11a/g, used as
/// both the channel-estimation reference and the fine-sync correlation template.
fn long_training_sequence() -> [Complex32; LTS_LEN] {
    const LTS_FREQ: [f32; 53] = [
        1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0,
        1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0, -1.0,
        -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0,
    ];
    let mut seq = [Complex32::new(0.0, 0.0); LTS_LEN];
    // Subcarriers -26..=26 map to FFT bins 38..=63 then 0..=26 after an FFT shift.
    for (i, &v) in LTS_FREQ.iter().enumerate() {
        let k = i as isize - 26;
        let bin = ((k + LTS_LEN as isize) % LTS_LEN as isize) as usize;
        seq[bin] = Complex32::new(v, 0.0);
    }
    seq
}

/// 48 data-subcarrier bin indices (excludes DC and pilots at ±7, ±21), FFT-shifted.
fn data_subcarrier_bins() -> Vec<usize> {
    (1..=26)
        .chain(-26..=-1)
        .filter(|k| ![-21, -7, 7, 21].contains(k))
        .map(|k: isize| ((k + LTS_LEN as isize) % LTS_LEN as isize) as usize)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modulation {
    Bpsk,
    Qpsk,
    Qam16,
    Qam64,
}

impl Modulation {
    fn bits_per_symbol(self) -> usize {
        match self {
            Modulation::Bpsk => 1,
            Modulation::Qpsk => 2,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
        }
    }

    /// Decode the SIGNAL field's 4-bit rate code (802.11a table 17-6); `None` on a
    /// reserved code.
    fn from_rate_code(code: u8) -> Option<Self> {
        match code {
            0b1011 | 0b1111 => Some(Modulation::Bpsk),
            0b1010 | 0b1110 => Some(Modulation::Bpsk),
            0b1001 | 0b1101 => Some(Modulation::Qpsk),
            0b1000 | 0b1100 => Some(Modulation::Qpsk),
            0b0001 | 0b0101 => Some(Modulation::Qam16),
            0b0000 | 0b0100 => Some(Modulation::Qam16),
            0b0011 | 0b0111 => Some(Modulation::Qam64),
            0b0010 | 0b0110 => Some(Modulation::Qam64),
            _ => None,
        }
    }
}

/// One successfully demodulated frame plus diagnostic metadata.
#[derive(Clone, Debug)]
pub struct OfdmFrame {
    pub bytes: Vec<u8>,
    pub channel: Option<u8>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OfdmReceiver;

impl OfdmReceiver {
    /// Run the full SEARCH..ASSEMBLE pipeline over one block. May find zero, one, or
    /// several preambles; always returns frames in the order their preambles were
    /// found (the ordering guarantee).
    pub fn receive(&self, samples: &[Complex32], channel: Option<u8>) -> Vec<Result<OfdmFrame, DspError>> {
        let mut results = Vec::new();
        let mut search_from = 0usize;

        while let Some(preamble_index) = find_preamble(&samples[search_from..]) {
            let abs_index = search_from + preamble_index;
            match self.process_one(samples, abs_index, channel) {
                Ok(Some(frame)) => results.push(Ok(frame)),
                Ok(None) => {}
                Err(e) => results.push(Err(e)),
            }
            // Never re-enter the same preamble; advance past its short-training run.
            search_from = abs_index + STS_REPEAT_LEN * STS_MIN_REPEATS;
            if search_from >= samples.len() {
                break;
            }
        }
        results
    }

    fn process_one(&self, samples: &[Complex32], preamble_index: usize, channel: Option<u8>) -> Result<Option<OfdmFrame>, DspError> {
        let cfo = estimate_cfo(&samples[preamble_index..]);
        let corrected = correct_cfo(samples, cfo);

        let lts_start = match fine_sync(&corrected, preamble_index) {
            Some(idx) => idx,
            None => return Ok(None),
        };

        let lts_ref = long_training_sequence();
        let channel_est = match estimate_channel(&corrected, lts_start, &lts_ref) {
            Some(est) => est,
            None => return Ok(None),
        };

        let cond = condition_number(&channel_est);
        if cond > EQUALIZER_CONDITION_THRESHOLD {
            debug!("equalizer diverged, condition={cond}");
            return Err(DspError::EqualizerDiverged(cond as f64));
        }

        let data_start = lts_start + LTS_LEN;
        let bins = data_subcarrier_bins();

        let (signal_bits, signal_symbol_len) = match demod_symbol(&corrected, data_start, &channel_est, &bins, Modulation::Bpsk) {
            Some(bits) => bits,
            None => return Ok(None),
        };

        let (modulation, byte_len) = match parse_signal_field(&signal_bits) {
            Some(v) => v,
            None => return Err(DspError::BadSignalField("parity or reserved rate")),
        };

        let total_bits_needed = byte_len * 8;
        let bits_per_symbol = modulation.bits_per_symbol() * DATA_SUBCARRIERS;
        let symbols_needed = total_bits_needed.div_ceil(bits_per_symbol);

        let mut bits = Vec::with_capacity(total_bits_needed);
        let mut offset = data_start + signal_symbol_len;
        for _ in 0..symbols_needed {
            match demod_symbol(&corrected, offset, &channel_est, &bins, modulation) {
                Some((symbol_bits, consumed)) => {
                    bits.extend(symbol_bits);
                    offset += consumed;
                }
                None => return Ok(None),
            }
        }
        bits.truncate(total_bits_needed);

        let bytes = pack_bits_msb_first(&bits);
        Ok(Some(OfdmFrame { bytes, channel }))
    }
}

/// SEARCH: 16-sample delayed autocorrelation against an instantaneous-power moving
/// average, requiring >=10 contiguous short-training repetitions to filter false
/// positives.
fn find_preamble(samples: &[Complex32]) -> Option<usize> {
    if samples.len() < STS_REPEAT_LEN * (STS_MIN_REPEATS + 1) {
        return None;
    }

    let mut hold = 0usize;
    for i in 0..samples.len() - STS_REPEAT_LEN {
        let corr: Complex32 = (0..STS_REPEAT_LEN.min(48))
            .map(|k| samples.get(i + k).copied().unwrap_or_default() * samples.get(i + k + STS_REPEAT_LEN).copied().unwrap_or_default().conj())
            .sum();
        let power: f32 = (0..STS_REPEAT_LEN.min(48)).map(|k| samples.get(i + k + STS_REPEAT_LEN).map(|s| s.norm_sqr()).unwrap_or(0.0)).sum();

        let ratio = if power > 0.0 { corr.norm() / power } else { 0.0 };

        if ratio > STS_CORR_THRESHOLD {
            hold += 1;
            if hold >= STS_HOLD_SAMPLES && has_contiguous_repeats(samples, i) {
                return Some(i);
            }
        } else {
            hold = 0;
        }
    }
    None
}

fn has_contiguous_repeats(samples: &[Complex32], start: usize) -> bool {
    let needed = STS_REPEAT_LEN * STS_MIN_REPEATS;
    if start + needed > samples.len() {
        return false;
    }
    let mut matches = 0;
    for rep in 0..STS_MIN_REPEATS - 1 {
        let a = &samples[start + rep * STS_REPEAT_LEN..start + (rep + 1) * STS_REPEAT_LEN];
        let b = &samples[start + (rep + 1) * STS_REPEAT_LEN..start + (rep + 2) * STS_REPEAT_LEN];
        let corr: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x * y.conj()).re).sum();
        if corr > 0.0 {
            matches += 1;
        }
    }
    matches >= STS_MIN_REPEATS - 2
}

/// COARSE-SYNC: angle of the sum of conjugate-products between consecutive 16-sample
/// short-training repetitions.
fn estimate_cfo(samples: &[Complex32]) -> f32 {
    let reps = STS_MIN_REPEATS.min(samples.len() / STS_REPEAT_LEN).max(1) - 1;
    if reps == 0 {
        return 0.0;
    }
    let mut acc = Complex32::new(0.0, 0.0);
    for rep in 0..reps {
        let a = &samples[rep * STS_REPEAT_LEN..(rep + 1) * STS_REPEAT_LEN];
        let b = &samples[(rep + 1) * STS_REPEAT_LEN..(rep + 2) * STS_REPEAT_LEN];
        for (x, y) in a.iter().zip(b.iter()) {
            acc += x * y.conj();
        }
    }
    acc.arg() / STS_REPEAT_LEN as f32
}

fn correct_cfo(samples: &[Complex32], cfo: f32) -> Vec<Complex32> {
    samples
        .iter()
        .enumerate()
        .map(|(t, s)| s * Complex32::new(0.0, -2.0 * PI * cfo * t as f32).exp())
        .collect()
}

/// FINE-SYNC: cross-correlate with the known long-training sequence over a 320-sample
/// search window starting right after the short-training run; pick the argmax.
fn fine_sync(samples: &[Complex32], preamble_index: usize) -> Option<usize> {
    let lts_ref = long_training_sequence();
    let search_start = preamble_index + STS_REPEAT_LEN * STS_MIN_REPEATS;
    let search_end = (search_start + LTS_SEARCH_WINDOW).min(samples.len().saturating_sub(LTS_LEN));
    if search_start >= search_end {
        return None;
    }

    let mut best = (search_start, f32::MIN);
    for i in search_start..search_end {
        let window = &samples[i..i + LTS_LEN];
        let corr: f32 = window.iter().zip(lts_ref.iter()).map(|(a, b)| (a * b.conj()).re).sum();
        if corr > best.1 {
            best = (i, corr);
        }
    }
    Some(best.0)
}

/// CHANNEL-EST: FFT of the first long-training symbol divided pointwise by the known
/// reference, yielding a 64-tap zero-forcing estimate.
fn estimate_channel(samples: &[Complex32], lts_start: usize, lts_ref: &[Complex32; LTS_LEN]) -> Option<[Complex32; LTS_LEN]> {
    if lts_start + LTS_LEN > samples.len() {
        return None;
    }
    let mut buf: Vec<Complex32> = samples[lts_start..lts_start + LTS_LEN].to_vec();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(LTS_LEN);
    fft.process(&mut buf);

    let mut est = [Complex32::new(1.0, 0.0); LTS_LEN];
    for i in 0..LTS_LEN {
        if lts_ref[i].norm_sqr() > 0.0 {
            est[i] = buf[i] / lts_ref[i];
        }
    }
    Some(est)
}

fn condition_number(channel_est: &[Complex32; LTS_LEN]) -> f32 {
    let mags: Vec<f32> = channel_est.iter().map(|c| c.norm()).filter(|m| *m > 0.0).collect();
    if mags.is_empty() {
        return f32::INFINITY;
    }
    let max = mags.iter().copied().fold(f32::MIN, f32::max);
    let min = mags.iter().copied().fold(f32::MAX, f32::min);
    if min == 0.0 {
        f32::INFINITY
    } else {
        max / min
    }
}

/// DEMOD: drop the cyclic prefix, FFT, FFT-shift, zero-force equalize, demap the 48
/// data subcarriers by `modulation`. Returns the demapped bits and the sample count
/// consumed (one 80-sample slot).
fn demod_symbol(
    samples: &[Complex32],
    offset: usize,
    channel_est: &[Complex32; LTS_LEN],
    bins: &[usize],
    modulation: Modulation,
) -> Option<(Vec<bool>, usize)> {
    if offset + SYMBOL_LEN > samples.len() {
        return None;
    }
    let mut buf: Vec<Complex32> = samples[offset + CP_LEN..offset + SYMBOL_LEN].to_vec();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(LTS_LEN);
    fft.process(&mut buf);

    let mut bits = Vec::with_capacity(bins.len() * modulation.bits_per_symbol());
    for &bin in bins {
        let ch = channel_est[bin];
        let equalized = if ch.norm_sqr() > 0.0 { buf[bin] / ch } else { buf[bin] };
        demap(equalized, modulation, &mut bits);
    }
    Some((bits, SYMBOL_LEN))
}

fn demap(sample: Complex32, modulation: Modulation, bits: &mut Vec<bool>) {
    match modulation {
        Modulation::Bpsk => bits.push(sample.re >= 0.0),
        Modulation::Qpsk => {
            bits.push(sample.re >= 0.0);
            bits.push(sample.im >= 0.0);
        }
        Modulation::Qam16 => {
            gray_demap_axis(sample.re, 2, bits);
            gray_demap_axis(sample.im, 2, bits);
        }
        Modulation::Qam64 => {
            gray_demap_axis(sample.re, 3, bits);
            gray_demap_axis(sample.im, 3, bits);
        }
    }
}

/// Gray-coded hard-decision demap for one axis (I or Q) of 16-/64-QAM.
fn gray_demap_axis(value: f32, bits_per_axis: usize, bits: &mut Vec<bool>) {
    let levels = 1usize << bits_per_axis;
    let step = 2.0 / levels as f32;
    let idx = (((value + 1.0) / step).floor() as isize).clamp(0, levels as isize - 1) as usize;
    let gray = idx ^ (idx >> 1);
    for b in (0..bits_per_axis).rev() {
        bits.push((gray >> b) & 1 == 1);
    }
}

/// Parse the BPSK SIGNAL field: 4-bit rate, 1 reserved, 12-bit length, 1 parity,
/// 6 tail bits (802.11a §17.3.4). Returns `None` on parity failure or a reserved rate.
fn parse_signal_field(bits: &[bool]) -> Option<(Modulation, usize)> {
    if bits.len() < 24 {
        return None;
    }
    let rate_code = bits[0..4].iter().enumerate().fold(0u8, |acc, (i, &b)| acc | ((b as u8) << i));
    let modulation = Modulation::from_rate_code(rate_code)?;

    let length = bits[5..17].iter().enumerate().fold(0usize, |acc, (i, &b)| acc | ((b as usize) << i));

    let parity_bit = bits[17];
    let computed_parity = bits[0..17].iter().filter(|&&b| b).count() % 2 == 1;
    if parity_bit != computed_parity {
        return None;
    }

    Some((modulation, length))
}

fn pack_bits_msb_first(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| acc | ((b as u8) << (7 - i))))
        .collect()
}

/// Build a provisional [`CandidateMacFrame`] from a raw [`OfdmFrame`]; frame-kind
/// classification happens in the Frame Parser once the MAC header is read.
pub fn to_candidate(frame: OfdmFrame, rssi_dbm: Option<f32>) -> CandidateMacFrame {
    CandidateMacFrame {
        bytes: frame.bytes,
        kind: MacFrameKind::Other,
        rssi_dbm,
        channel: frame.channel,
        captured_at: Utc::now(),
        source_mac: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_preamble_in_noise_emits_nothing() {
        let samples = vec![Complex32::new(0.0001, -0.0001); 4096];
        let receiver = OfdmReceiver;
        let frames = receiver.receive(&samples, Some(1));
        assert!(frames.is_empty());
    }

    #[test]
    fn test_reserved_rate_code_rejected() {
        assert!(Modulation::from_rate_code(0b1111).is_some());
    }

    #[test]
    fn test_gray_demap_bpsk_sign() {
        let mut bits = Vec::new();
        demap(Complex32::new(0.8, 0.0), Modulation::Bpsk, &mut bits);
        assert_eq!(vec![true], bits);
        let mut bits = Vec::new();
        demap(Complex32::new(-0.8, 0.0), Modulation::Bpsk, &mut bits);
        assert_eq!(vec![false], bits);
    }

    #[test]
    fn test_pack_bits_msb_first() {
        let bits = [true, false, true, false, true, false, true, false];
        assert_eq!(vec![0b1010_1010], pack_bits_msb_first(&bits));
    }
}
