//! Sweeps over oscillator lengths and sample counts at one operating point.
//!
//! Each run writes one framed recording named after the suite convention.
//! A `sweep.toml` manifest next to the recordings lists every run with its
//! outcome and timestamps.

use super::naming::{OperatingPoint, SampleName};
use crate::acquisition::{CollectError, Collector};
use crate::config::{AcquisitionConfig, ConfigError};
use crate::framing::WriterSink;
use crate::hw::RegisterBlock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Name of the manifest written next to the recordings.
pub const MANIFEST_FILE: &str = "sweep.toml";

#[derive(Debug, Error)]
/// Errors that end a sweep.
pub enum SweepError {
    /// A run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A run failed.
    #[error("run {file} failed: {source}")]
    Collect {
        /// Recording the run was writing.
        file: String,
        /// Why it failed.
        #[source]
        source: CollectError,
    },
    /// Creating a recording or the manifest failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The manifest could not be serialized.
    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] toml::ser::Error),
    #[error("sweep has no runs")]
    Empty,
}

/// What a sweep records.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    /// Mode and buffer size shared by every run.
    pub base: AcquisitionConfig,
    /// Oscillator lengths to record.
    pub rosc_lengths: Vec<u32>,
    /// Sample counts to record at each length.
    pub sample_counts: Vec<u32>,
    /// Conditions of every run.
    pub point: OperatingPoint,
    /// File name prefix.
    pub prefix: String,
}

impl SweepPlan {
    /// Expands the plan into validated per-run configurations.
    pub fn runs(&self) -> Result<Vec<(SampleName, AcquisitionConfig)>, SweepError> {
        let mut runs = Vec::with_capacity(self.rosc_lengths.len() * self.sample_counts.len());
        for &rosc_length in &self.rosc_lengths {
            for &sample_count in &self.sample_counts {
                let config = self
                    .base
                    .with_rosc_length(rosc_length)?
                    .with_sample_count(sample_count)?;
                let name = SampleName {
                    rosc_length,
                    sample_count,
                    point: self.point,
                };
                runs.push((name, config));
            }
        }
        if runs.is_empty() {
            return Err(SweepError::Empty);
        }
        Ok(runs)
    }
}

/// One recording in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRecord {
    /// Recording file name.
    pub file: String,
    /// Ring oscillator length.
    pub rosc_length: u32,
    /// Sample counter value.
    pub sample_count: u32,
    /// Body blocks recorded.
    pub blocks: u32,
    /// Body blocks the buffer size called for.
    pub requested_blocks: u32,
    /// Cumulative error mask bits.
    pub error_mask: u32,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
}

/// Manifest written after a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepManifest {
    /// File name prefix.
    pub prefix: String,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
    /// False when the sweep was stopped before its last run.
    pub completed: bool,
    /// Conditions of every run.
    pub point: OperatingPoint,
    /// Base configuration of the sweep.
    pub config: AcquisitionConfig,
    /// Completed runs in order.
    pub runs: Vec<SweepRecord>,
}

impl SweepManifest {
    /// Encodes the manifest as TOML.
    pub fn to_toml(&self) -> Result<String, SweepError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the manifest into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, SweepError> {
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }
}

/// Runs every recording of `plan` into `out_dir`.
///
/// `stop` is checked between runs; a run in progress always finishes. The
/// manifest is written even when a run fails, listing the runs before it.
pub fn run_sweep<R: RegisterBlock>(
    collector: &mut Collector<R>,
    plan: &SweepPlan,
    out_dir: &Path,
    stop: &AtomicBool,
) -> Result<SweepManifest, SweepError> {
    let runs = plan.runs()?;
    std::fs::create_dir_all(out_dir)?;

    let mut manifest = SweepManifest {
        prefix: plan.prefix.clone(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        completed: false,
        point: plan.point,
        config: plan.base,
        runs: Vec::with_capacity(runs.len()),
    };
    tracing::info!(runs = runs.len(), dir = %out_dir.display(), "Starting sweep");

    let mut failure = None;
    for (name, config) in &runs {
        if stop.load(Ordering::SeqCst) {
            tracing::warn!(done = manifest.runs.len(), "Sweep interrupted");
            break;
        }

        let file = name.file_name(&plan.prefix);
        match record(collector, config, &out_dir.join(&file)) {
            Ok((collection, started_at)) => manifest.runs.push(SweepRecord {
                file,
                rosc_length: name.rosc_length,
                sample_count: name.sample_count,
                blocks: collection.blocks,
                requested_blocks: collection.requested_blocks,
                error_mask: collection.mask.bits(),
                started_at,
                finished_at: Utc::now(),
            }),
            Err(source) => {
                failure = Some(SweepError::Collect { file, source });
                break;
            }
        }
    }

    manifest.finished_at = Utc::now();
    manifest.completed = manifest.runs.len() == runs.len();
    manifest.write_to(out_dir)?;

    match failure {
        Some(err) => Err(err),
        None => {
            tracing::info!(runs = manifest.runs.len(), "Sweep finished");
            Ok(manifest)
        }
    }
}

fn record<R: RegisterBlock>(
    collector: &mut Collector<R>,
    config: &AcquisitionConfig,
    path: &Path,
) -> Result<(crate::acquisition::Collection, DateTime<Utc>), CollectError> {
    let started_at = Utc::now();
    let mut sink = WriterSink::new(BufWriter::new(File::create(path)?));
    let collection = collector.run(config, &mut sink)?;
    sink.into_inner()?;
    Ok((collection, started_at))
}
