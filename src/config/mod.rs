//! Collection parameters.
//!
//! [`AcquisitionConfig`] is validated on construction and never changes
//! afterwards; it fully determines how the hardware is programmed and what
//! the frame header says.

mod acquisition;
mod file;

pub use acquisition::{
    AcquisitionConfig, ConfigError, TrngMode, MAX_ROSC_LENGTH, MIN_SAMPLE_COUNT,
};
pub use file::{FileConfig, PollingConfig, SimulationConfig};
