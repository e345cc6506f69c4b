//! Acquisition parameters and their validation.
//!
//! Every check runs before the hardware is touched. The order of the checks
//! is part of the contract: the first violated constraint decides the error.

use crate::framing::format::{MAX_BUFFER_BYTES, MIN_BUFFER_BYTES};
use crate::hw::registers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest ring oscillator length the block supports.
pub const MAX_ROSC_LENGTH: u32 = 3;
/// Smallest sample counter value the block accepts.
pub const MIN_SAMPLE_COUNT: u32 = 1;

/// Sampling mode. Selects which internal conditioning stages are bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrngMode {
    /// Raw output: Von Neumann, CRNGT and autocorrelation all bypassed.
    Fast = 0,
    /// Full evaluation (AIS-31): nothing bypassed.
    FullEvaluation = 1,
    /// SP 800-90B: Von Neumann and autocorrelation bypassed, CRNGT active.
    #[serde(rename = "sp800-90b")]
    Sp80090b = 2,
}

impl TrngMode {
    /// Value of the debug control register for this mode.
    pub fn bypass_mask(self) -> u32 {
        match self {
            Self::Fast => {
                registers::DEBUG_VNC_BYPASS
                    | registers::DEBUG_CRNGT_BYPASS
                    | registers::DEBUG_AUTOCORR_BYPASS
            }
            Self::FullEvaluation => 0,
            Self::Sp80090b => registers::DEBUG_VNC_BYPASS | registers::DEBUG_AUTOCORR_BYPASS,
        }
    }

    /// Numeric mode as carried in the frame header.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for TrngMode {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Fast),
            1 => Ok(Self::FullEvaluation),
            2 => Ok(Self::Sp80090b),
            other => Err(ConfigError::InvalidMode(other)),
        }
    }
}

impl fmt::Display for TrngMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::FullEvaluation => "full-evaluation",
            Self::Sp80090b => "sp800-90b",
        })
    }
}

/// Validated parameters of one collection.
///
/// Fields are private so a value of this type is always within range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAcquisition", into = "RawAcquisition")]
pub struct AcquisitionConfig {
    mode: TrngMode,
    rosc_length: u32,
    sample_count: u32,
    buffer_size: u32,
}

impl AcquisitionConfig {
    /// Validates typed parameters.
    pub fn new(
        mode: TrngMode,
        rosc_length: u32,
        sample_count: u32,
        buffer_size: u32,
    ) -> Result<Self, ConfigError> {
        Self::from_raw(mode.code(), rosc_length, sample_count, buffer_size)
    }

    /// Validates raw parameters in the fixed order
    /// mode, oscillator length, sample count, buffer size.
    pub fn from_raw(
        mode: u32,
        rosc_length: u32,
        sample_count: u32,
        buffer_size: u32,
    ) -> Result<Self, ConfigError> {
        let mode = TrngMode::try_from(mode)?;

        if rosc_length > MAX_ROSC_LENGTH {
            return Err(ConfigError::InvalidRoscLength(rosc_length));
        }
        if sample_count < MIN_SAMPLE_COUNT {
            return Err(ConfigError::InvalidSampleCount(sample_count));
        }
        if !(MIN_BUFFER_BYTES..MAX_BUFFER_BYTES).contains(&buffer_size) {
            return Err(ConfigError::InvalidBufferSize(buffer_size));
        }

        Ok(Self {
            mode,
            rosc_length,
            sample_count,
            buffer_size,
        })
    }

    #[inline]
    /// Sampling mode.
    pub fn mode(&self) -> TrngMode {
        self.mode
    }

    #[inline]
    /// Ring oscillator length, 0 to [`MAX_ROSC_LENGTH`].
    pub fn rosc_length(&self) -> u32 {
        self.rosc_length
    }

    #[inline]
    /// Sample counter value: clock cycles between two oscillator samples.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Buffer capacity in bytes, header and footer included.
    #[inline]
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Number of body blocks a full collection produces.
    pub fn block_count(&self) -> u32 {
        crate::framing::format::block_count(self.buffer_size)
    }

    /// Returns a copy with a different oscillator length.
    pub fn with_rosc_length(&self, rosc_length: u32) -> Result<Self, ConfigError> {
        Self::new(self.mode, rosc_length, self.sample_count, self.buffer_size)
    }

    /// Returns a copy with a different sample count.
    pub fn with_sample_count(&self, sample_count: u32) -> Result<Self, ConfigError> {
        Self::new(self.mode, self.rosc_length, sample_count, self.buffer_size)
    }
}

impl Default for AcquisitionConfig {
    /// Raw fast-mode capture of a 1 MiB buffer.
    fn default() -> Self {
        Self {
            mode: TrngMode::Fast,
            rosc_length: 0,
            sample_count: 1000,
            buffer_size: 1 << 20,
        }
    }
}

/// Unvalidated form used for (de)serialization. Missing fields take the
/// values of [`AcquisitionConfig::default`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct RawAcquisition {
    mode: TrngMode,
    rosc_length: u32,
    sample_count: u32,
    buffer_size: u32,
}

impl Default for RawAcquisition {
    fn default() -> Self {
        AcquisitionConfig::default().into()
    }
}

impl TryFrom<RawAcquisition> for AcquisitionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAcquisition) -> Result<Self, Self::Error> {
        Self::new(raw.mode, raw.rosc_length, raw.sample_count, raw.buffer_size)
    }
}

impl From<AcquisitionConfig> for RawAcquisition {
    fn from(config: AcquisitionConfig) -> Self {
        Self {
            mode: config.mode,
            rosc_length: config.rosc_length,
            sample_count: config.sample_count,
            buffer_size: config.buffer_size,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Mode outside 0-2 (code -1).
    #[error("invalid TRNG mode {0} (must be 0-2)")]
    InvalidMode(u32),
    /// Oscillator length outside 0-3 (code -2).
    #[error("invalid ring oscillator length {0} (must be 0-3)")]
    InvalidRoscLength(u32),
    /// Sample count of zero (code -3).
    #[error("invalid sample count {0} (must be at least 1)")]
    InvalidSampleCount(u32),
    /// Buffer too small for one block or too large for the header (code -4).
    #[error("invalid buffer size {0} bytes (must be at least 52 and below 2^24)")]
    InvalidBufferSize(u32),
    /// No sink supplied (code -5).
    #[error("no output sink supplied")]
    NullSink,
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// Config text is malformed or fails validation.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl ConfigError {
    /// Legacy negative status code of a parameter error.
    ///
    /// File errors have no legacy code.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::InvalidMode(_) => Some(-1),
            Self::InvalidRoscLength(_) => Some(-2),
            Self::InvalidSampleCount(_) => Some(-3),
            Self::InvalidBufferSize(_) => Some(-4),
            Self::NullSink => Some(-5),
            Self::FileReadError(_) | Self::ParseError(_) => None,
        }
    }
}
