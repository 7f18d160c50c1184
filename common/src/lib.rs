//! Common code shared by every `ridsentinel` crate: config loading, logging/telemetry
//! initialization, and geofence/distance math used by the threat-assessment stage.
//!

mod config;
mod geofence;
mod logging;
mod macros;

pub use config::*;
pub use geofence::*;
pub use logging::*;
