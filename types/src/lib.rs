//! Shared wire and domain types for the detection pipeline.
//!
//! Every stage between the Sample Source and the Pub/Sub Sink exchanges data through
//! the types defined here: complex sample blocks in, spectral features and frame
//! candidates in the middle, Remote ID records and fused detection events out.
//!

pub use channel::*;
pub use detection::*;
pub use frame::*;
pub use remoteid::*;
pub use sample::*;
pub use spectral::*;

mod channel;
mod detection;
mod frame;
mod remoteid;
mod sample;
mod spectral;
