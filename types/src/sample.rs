//! Complex baseband sample blocks, as delivered by the Sample Source.
//!

use num_complex::Complex32;
use std::sync::Arc;

/// An immutable, ordered sequence of complex baseband samples captured in one shot.
///
/// Lifetime: produced by the Sample worker, consumed by the DSP chain (Preprocessor
/// through Frame Parser); freed once all frames for the block have been emitted.
#[derive(Clone, Debug)]
pub struct SampleBlock {
    pub samples: Arc<[Complex32]>,
    /// Absolute sample index of `samples[0]` since acquisition start.
    pub start_index: u64,
    pub sample_rate_hz: f64,
    pub center_freq_hz: u64,
}

impl SampleBlock {
    pub fn new(samples: Vec<Complex32>, start_index: u64, sample_rate_hz: f64, center_freq_hz: u64) -> Self {
        Self {
            samples: samples.into(),
            start_index,
            sample_rate_hz,
            center_freq_hz,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_block_len() {
        let block = SampleBlock::new(vec![Complex32::new(0.0, 0.0); 128], 0, 20e6, 2_412_000_000);
        assert_eq!(128, block.len());
        assert!(!block.is_empty());
    }
}
