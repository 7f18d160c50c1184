//! `ridsentineld`: the multi-transport orchestrator binary.
//!
//! This crate only wires the pieces `ridsentinel-engine` already knows how to do:
//! command-line parsing, YAML configuration, logging, and the process entry point.
//! The Sample Source and BLE Source themselves are external collaborators (§1) — this
//! binary ships a pair of no-op stand-ins so the actor wiring, heartbeat, and shutdown
//! path can be exercised end to end without a physical SDR or BLE adapter attached.

pub mod cli;
pub mod config;
pub mod error;
pub mod sources;

use clap::crate_version;

/// Binary name, taken from the package metadata so log lines and the banner always
/// match what `cargo install` produced.
pub const NAME: &str = env!("CARGO_BIN_NAME");
pub const VERSION: &str = crate_version!();

/// Return our version number
#[inline]
pub fn version() -> String {
    format!("{}/{}", NAME, VERSION)
}
