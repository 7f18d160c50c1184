//! Error types for the detection pipeline.
//!
//! Malformed input never panics and is never propagated upward past the stage that
//! detected it (§7): the DSP and decode paths return these as plain `Result`s, log at
//! debug, increment a counter, and move on. Only configuration and hardware-fatal
//! errors at startup surface as process-fatal.

use thiserror::Error;

/// Errors raised while processing one sample block through the DSP chain.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("band-pass cutoffs ({low}, {high}) Hz invert or exceed Nyquist ({nyquist} Hz)")]
    InvalidCutoffs { low: f64, high: f64, nyquist: f64 },
    #[error("equalizer diverged, condition number {0:.1} above threshold")]
    EqualizerDiverged(f64),
    #[error("malformed SIGNAL field: {0}")]
    BadSignalField(&'static str),
    #[error("empty sample block")]
    EmptyBlock,
}

/// Errors raised while parsing an 802.11 management frame body.
#[derive(Debug, Error)]
pub enum FrameParseError {
    #[error("frame body shorter than the fixed header ({needed} bytes needed, {got} got)")]
    Truncated { needed: usize, got: usize },
    #[error("element length overruns remaining body at offset {0}")]
    ElementOverrun(usize),
}

/// Errors raised while decoding ASTM F3411 messages from a byte window.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message type {0:#x} has an unrecognized payload length {1}")]
    BadPayloadLength(u8, usize),
    #[error("no structured or pattern-fallback record could be assembled")]
    NoRecord,
}

