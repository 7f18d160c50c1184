//! Command-line options for the `ridsentineld` orchestrator.
//!
//! Every flag here overrides the matching config-file value for this run only; none
//! of them are persisted back to disk.

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};
use clap_complete::Shell;

/// CLI options
#[derive(Parser, Debug)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// Configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Center frequency, in Hz.
    #[clap(short = 'f', long)]
    pub center_freq_hz: Option<u64>,
    /// Receiver gain, in dB.
    #[clap(short = 'g', long)]
    pub gain_db: Option<f32>,
    /// Sample rate, in Hz.
    #[clap(short = 'r', long)]
    pub sample_rate_hz: Option<f64>,
    /// Channel-plan mini-language expression, e.g. `2g:1-11` or `all`.
    #[clap(short = 'S', long)]
    pub scan_channels: Option<String>,
    /// Seconds to dwell on each channel before hopping.
    #[clap(long)]
    pub hop_interval_s: Option<u64>,
    /// Include 5 GHz UNII channels in a bare channel-number plan.
    #[clap(long)]
    pub include_5ghz: bool,
    /// Sample Source device-selector string (driver-specific).
    #[clap(short = 'd', long)]
    pub device_args: Option<String>,
    /// Disable the BLE ingestor even if configured.
    #[clap(long)]
    pub no_ble: bool,
    /// Verbose mode, can be repeated.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Enable the hierarchical span-tree log formatter.
    #[clap(long)]
    pub use_tree: bool,
    /// Directory for an hourly-rotating log file, in addition to stderr.
    #[clap(long)]
    pub use_file: Option<String>,
    /// Print shell completion script to stdout and exit, without starting the daemon.
    #[clap(long, value_name = "SHELL")]
    pub generate_completion: Option<Shell>,
}
