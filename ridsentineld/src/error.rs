//! Error module
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Status {
    #[error("Bad config file version {0}, expected {1}")]
    BadFileVersion(usize, usize),
    #[error("Missing configuration file, use -c or create {0}")]
    MissingConfig(String),
    #[error("Invalid channel plan {0:?}: {1}")]
    BadChannelPlan(String, String),
    #[error("Sample Source refused to initialize: {0}")]
    SampleSourceFatal(String),
    #[error("Neither a Sample Source nor a BLE Source is configured, nothing to do")]
    NoSourceConfigured,
}
