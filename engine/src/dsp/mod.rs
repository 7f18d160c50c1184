//! Preprocessor → Spectral Analyzer → Wi-Fi Classifier, the first half of the RF-to-frame
//! pipeline (§4.1-§4.3). Everything here is a pure function of its input block; no
//! shared mutable state beyond the atomic counters the caller maintains.

pub use classifier::{classify, detect_beacon_frames};
pub use preprocessor::{Normalization, PreprocessedBlock, Preprocessor, PreprocessorConfig};
pub use spectral::{SpectralAnalyzer, SpectralConfig};

mod classifier;
mod preprocessor;
mod spectral;
