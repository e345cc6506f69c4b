//! TOML configuration file.
//!
//! ```toml
//! [acquisition]
//! mode = "sp800-90b"
//! rosc_length = 1
//! sample_count = 1000
//! buffer_size = 1048576
//!
//! [polling]
//! max_attempts = 1000000
//!
//! [simulation]
//! seed = 7
//! overrun_at = [12]
//! ```

use super::{AcquisitionConfig, ConfigError};
use crate::hw::{registers, BlockEvent, PollStrategy, SimulatedTrng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Collection parameters.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    /// Hardware wait limits.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Script of the simulated register block.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Limits for the hardware busy-polls. Both unset means spin forever.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Give up after this many polls.
    pub max_attempts: Option<u64>,
    /// Give up after this many milliseconds.
    pub timeout_ms: Option<u64>,
}

impl PollingConfig {
    /// Poll strategy for these limits.
    pub fn strategy(&self) -> PollStrategy {
        PollStrategy::from_limits(self.max_attempts, self.timeout_ms.map(Duration::from_millis))
    }
}

/// Behavior of the simulated register block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the simulated data stream.
    pub seed: u64,
    /// Sample counter writes ignored after reset.
    pub sample_count_latch_delay: u32,
    /// Status polls before each block becomes ready.
    pub ready_delay_polls: u32,
    /// Blocks already waiting when the host looks (sample loss).
    pub overrun_at: Vec<u32>,
    /// Blocks reporting a CRNGT failure.
    pub crngt_at: Vec<u32>,
    /// Block at which the autocorrelation test fails.
    pub autocorrelation_at: Option<u32>,
}

impl SimulationConfig {
    /// Builds a simulator scripted with this configuration.
    pub fn build(&self) -> SimulatedTrng {
        let ready = |flags| BlockEvent::Ready {
            delay_polls: self.ready_delay_polls,
            flags,
        };
        let mut sim = SimulatedTrng::new(self.seed)
            .with_sample_count_latch_delay(self.sample_count_latch_delay)
            .with_default_event(ready(0));

        for &index in &self.crngt_at {
            sim = sim.with_event_at(index as usize, ready(registers::ISR_CRNGT_ERR));
        }
        for &index in &self.overrun_at {
            sim = sim.with_event_at(index as usize, BlockEvent::Overrun);
        }
        if let Some(index) = self.autocorrelation_at {
            sim = sim.with_event_at(index as usize, BlockEvent::Autocorrelation);
        }
        sim
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
