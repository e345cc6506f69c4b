//! File naming convention of characterization recordings.
//!
//! `<prefix>_R<rosc>_S<sample_count>_V<H|T|L>_T<H|T|L>_C<T|FF|FS|SF|SS>.bin`
//!
//! The name records the oscillator length, the sample counter value and the
//! operating point (supply voltage, temperature, process corner) a
//! recording was taken at.

use super::SuiteError;
use crate::framing::FrameHeader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extension of every recording.
pub const FILE_EXTENSION: &str = ".bin";

/// High / typical / low level of a voltage or temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    /// `H`
    High,
    /// `T`
    Typical,
    /// `L`
    Low,
}

impl Level {
    /// Every level.
    pub const ALL: [Level; 3] = [Self::High, Self::Typical, Self::Low];

    fn code(self) -> &'static str {
        match self {
            Self::High => "H",
            Self::Typical => "T",
            Self::Low => "L",
        }
    }
}

impl FromStr for Level {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" | "h" => Ok(Self::High),
            "T" | "t" => Ok(Self::Typical),
            "L" | "l" => Ok(Self::Low),
            other => Err(SuiteError::InvalidField(format!("level '{other}'"))),
        }
    }
}

/// Silicon process corner of the device under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessCorner {
    /// `T`
    Typical,
    /// `FF`
    FastFast,
    /// `FS`
    FastSlow,
    /// `SF`
    SlowFast,
    /// `SS`
    SlowSlow,
}

impl ProcessCorner {
    /// Every corner.
    pub const ALL: [ProcessCorner; 5] = [
        Self::Typical,
        Self::FastFast,
        Self::FastSlow,
        Self::SlowFast,
        Self::SlowSlow,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::Typical => "T",
            Self::FastFast => "FF",
            Self::FastSlow => "FS",
            Self::SlowFast => "SF",
            Self::SlowSlow => "SS",
        }
    }
}

impl FromStr for ProcessCorner {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|corner| corner.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| SuiteError::InvalidField(format!("process corner '{s}'")))
    }
}

/// Conditions a recording was taken under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Supply voltage.
    pub voltage: Level,
    /// Die temperature.
    pub temperature: Level,
    /// Process corner.
    pub corner: ProcessCorner,
}

impl OperatingPoint {
    /// Every operating point a complete suite covers.
    pub fn all() -> impl Iterator<Item = OperatingPoint> {
        Level::ALL.into_iter().flat_map(|voltage| {
            Level::ALL.into_iter().flat_map(move |temperature| {
                ProcessCorner::ALL.into_iter().map(move |corner| OperatingPoint {
                    voltage,
                    temperature,
                    corner,
                })
            })
        })
    }
}

impl Default for OperatingPoint {
    fn default() -> Self {
        Self {
            voltage: Level::Typical,
            temperature: Level::Typical,
            corner: ProcessCorner::Typical,
        }
    }
}

/// Parsed name of one recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleName {
    /// Ring oscillator length.
    pub rosc_length: u32,
    /// Sample counter value.
    pub sample_count: u32,
    /// Conditions of the recording.
    pub point: OperatingPoint,
}

impl SampleName {
    /// Parses a file name (not a path). The prefix is ignored.
    pub fn parse(file_name: &str) -> Result<Self, SuiteError> {
        let invalid = || SuiteError::InvalidName(file_name.to_string());

        let stem = file_name.strip_suffix(FILE_EXTENSION).ok_or_else(invalid)?;
        let mut fields = stem.rsplitn(6, '_');
        let mut field = |tag: char| {
            fields
                .next()
                .and_then(|f| f.strip_prefix(tag))
                .filter(|f| !f.is_empty())
                .ok_or_else(invalid)
        };

        // Fields come back last-first.
        let corner = field('C')?.parse()?;
        let temperature = field('T')?.parse()?;
        let voltage = field('V')?.parse()?;
        let sample_count = field('S')?.parse::<u32>().map_err(|_| invalid())?;
        let rosc_length = field('R')?.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            rosc_length,
            sample_count,
            point: OperatingPoint {
                voltage,
                temperature,
                corner,
            },
        })
    }

    /// Formats the file name for this recording.
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{prefix}_{self}{FILE_EXTENSION}")
    }

    /// Checks that a recorded header agrees with this name.
    pub fn check_header(&self, header: &FrameHeader) -> Result<(), SuiteError> {
        if header.sample_count != self.sample_count {
            return Err(SuiteError::HeaderMismatch {
                field: "sample count",
                named: self.sample_count,
                recorded: header.sample_count,
            });
        }
        if header.rosc_length != self.rosc_length {
            return Err(SuiteError::HeaderMismatch {
                field: "oscillator length",
                named: self.rosc_length,
                recorded: header.rosc_length,
            });
        }
        Ok(())
    }
}

impl fmt::Display for SampleName {
    /// The name without prefix and extension, e.g. `R0_S1000_VT_TT_CT`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}_S{}_V{}_T{}_C{}",
            self.rosc_length,
            self.sample_count,
            self.point.voltage.code(),
            self.point.temperature.code(),
            self.point.corner.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrngMode;

    #[test]
    fn test_parse_name() {
        let name = SampleName::parse("chip_a_R2_S1500_VH_TL_CFS.bin").unwrap();
        assert_eq!(name.rosc_length, 2);
        assert_eq!(name.sample_count, 1500);
        assert_eq!(name.point.voltage, Level::High);
        assert_eq!(name.point.temperature, Level::Low);
        assert_eq!(name.point.corner, ProcessCorner::FastSlow);
        assert_eq!(name.file_name("chip_a"), "chip_a_R2_S1500_VH_TL_CFS.bin");
    }

    #[test]
    fn test_parse_without_prefix() {
        let name = SampleName::parse("R0_S10_VT_TT_CT.bin").unwrap();
        assert_eq!(name.sample_count, 10);
    }

    #[test]
    fn test_rejects_bad_names() {
        for bad in [
            "chip_R0_S10_VT_TT_CT.dat",
            "chip_R0_S10_VT_TT.bin",
            "chip_R0_Sx_VT_TT_CT.bin",
            "chip_R0_S10_VX_TT_CT.bin",
            "chip_R0_S10_VT_TT_CXX.bin",
        ] {
            assert!(SampleName::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_operating_points() {
        assert_eq!(OperatingPoint::all().count(), 45);
    }

    #[test]
    fn test_check_header() {
        let name = SampleName::parse("x_R1_S200_VT_TT_CT.bin").unwrap();
        let mut header = FrameHeader {
            mode: TrngMode::Fast,
            rosc_length: 1,
            buffer_size: 52,
            sample_count: 200,
        };
        assert!(name.check_header(&header).is_ok());

        header.sample_count = 201;
        assert!(matches!(
            name.check_header(&header),
            Err(SuiteError::HeaderMismatch { field: "sample count", .. })
        ));
    }
}
