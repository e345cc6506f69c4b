//! Completeness check of a characterization suite.

use super::naming::{OperatingPoint, SampleName};
use super::SuiteError;
use std::collections::{BTreeSet, HashSet};

/// Distinct sample counter values a complete suite is recorded at.
pub const SUITE_SAMPLE_COUNTS: usize = 3;

/// Outcome of [`check_suite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    /// Distinct sample counts found, ascending.
    pub sample_counts: Vec<u32>,
    /// Recordings whose names follow the convention.
    pub recognized: usize,
    /// Names that do not follow the convention and were skipped.
    pub ignored: Vec<String>,
    /// Combinations with no recording, in suite order.
    pub missing: Vec<SampleName>,
}

impl SuiteReport {
    /// True when no combination is missing.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks that `names` cover every oscillator length, operating point and
/// sample count of a suite.
///
/// A suite is recorded at exactly [`SUITE_SAMPLE_COUNTS`] sample counts;
/// any other number is an error rather than a list of missing files.
pub fn check_suite<I, S>(names: I) -> Result<SuiteReport, SuiteError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut present = HashSet::new();
    let mut ignored = Vec::new();
    for name in names {
        let name = name.as_ref();
        match SampleName::parse(name) {
            Ok(parsed) => {
                present.insert(parsed);
            }
            Err(_) => {
                tracing::debug!(file = name, "Skipping file outside the naming convention");
                ignored.push(name.to_string());
            }
        }
    }

    let sample_counts: BTreeSet<u32> = present.iter().map(|n| n.sample_count).collect();
    if sample_counts.len() != SUITE_SAMPLE_COUNTS {
        return Err(SuiteError::SampleCounts {
            expected: SUITE_SAMPLE_COUNTS,
            found: sample_counts.into_iter().collect(),
        });
    }

    let mut missing = Vec::new();
    for rosc_length in 0..=crate::config::MAX_ROSC_LENGTH {
        for &sample_count in &sample_counts {
            for point in OperatingPoint::all() {
                let name = SampleName {
                    rosc_length,
                    sample_count,
                    point,
                };
                if !present.contains(&name) {
                    missing.push(name);
                }
            }
        }
    }

    if !missing.is_empty() {
        tracing::warn!(missing = missing.len(), "Suite is incomplete");
    }

    Ok(SuiteReport {
        sample_counts: sample_counts.into_iter().collect(),
        recognized: present.len(),
        ignored,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_suite(counts: &[u32]) -> Vec<String> {
        let mut names = Vec::new();
        for rosc_length in 0..=3 {
            for &sample_count in counts {
                for point in OperatingPoint::all() {
                    let name = SampleName {
                        rosc_length,
                        sample_count,
                        point,
                    };
                    names.push(name.file_name("dut"));
                }
            }
        }
        names
    }

    #[test]
    fn test_complete_suite() {
        let mut names = full_suite(&[100, 1000, 10000]);
        names.push("notes.txt".to_string());

        let report = check_suite(&names).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.sample_counts, vec![100, 1000, 10000]);
        assert_eq!(report.recognized, 4 * 3 * 45);
        assert_eq!(report.ignored, vec!["notes.txt".to_string()]);
    }

    #[test]
    fn test_reports_missing_files() {
        let mut names = full_suite(&[1, 2, 3]);
        names.retain(|n| n != "dut_R2_S3_VL_TH_CSS.bin");

        let report = check_suite(&names).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].to_string(), "R2_S3_VL_TH_CSS");
    }

    #[test]
    fn test_wrong_number_of_sample_counts() {
        let names = full_suite(&[1, 2]);
        let err = check_suite(&names).unwrap_err();
        assert!(matches!(
            err,
            SuiteError::SampleCounts { expected: 3, ref found } if found == &[1, 2]
        ));
    }

    #[test]
    fn test_empty_directory() {
        assert!(check_suite(Vec::<String>::new()).is_err());
    }
}
