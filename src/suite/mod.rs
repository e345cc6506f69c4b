//! Characterization suites.
//!
//! A suite is a directory of recordings covering every oscillator length
//! at three sample counts across all supply voltage, temperature and
//! process corner combinations. This module names recordings, checks a
//! directory for completeness and records sweeps at one operating point.

mod check;
mod naming;
mod sweep;

pub use check::{check_suite, SuiteReport, SUITE_SAMPLE_COUNTS};
pub use naming::{Level, OperatingPoint, ProcessCorner, SampleName, FILE_EXTENSION};
pub use sweep::{run_sweep, SweepError, SweepManifest, SweepPlan, SweepRecord, MANIFEST_FILE};

use thiserror::Error;

/// Errors from suite naming and completeness checks.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// File name does not follow the convention.
    #[error("'{0}' does not follow the suite naming convention")]
    InvalidName(String),
    /// A name field has an unknown code.
    #[error("invalid {0}")]
    InvalidField(String),
    /// Wrong number of distinct sample counts.
    #[error("a suite needs exactly {expected} sample counts, found {found:?}")]
    SampleCounts {
        /// Required number.
        expected: usize,
        /// Counts present, ascending.
        found: Vec<u32>,
    },
    /// Header and file name disagree.
    #[error("{field} is {recorded} in the header but {named} in the file name")]
    HeaderMismatch {
        /// Field that differs.
        field: &'static str,
        /// Value in the file name.
        named: u32,
        /// Value in the header.
        recorded: u32,
    },
}
