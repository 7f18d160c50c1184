//! The detection pipeline: DSP chain, OFDM receiver, frame parser, Remote ID decoder,
//! BLE ingestor and orchestrator (§2, §4).
//!
//! Data flows left-to-right: Sample Source → [`dsp`] → [`ofdm`] → [`frame_parser`] →
//! [`remoteid_decoder`] → [`orchestrator`] → Pub/Sub. The [`ble`] ingestor feeds
//! `remoteid_decoder` directly, bypassing the RF chain entirely.

pub mod actors;
#[cfg(feature = "ble")]
pub mod ble;
pub mod dsp;
pub mod error;
pub mod frame_parser;
#[cfg(feature = "wifi")]
pub mod ofdm;
pub mod orchestrator;
pub mod remoteid_decoder;
