//! TRNG Characterization CLI
//!
//! Records framed raw-sample collections, runs characterization sweeps and
//! verifies recorded files. Collections run against the simulated register
//! block; memory-mapped hardware is reached through the library API.

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use trng_characterization::{
    config::{FileConfig, PollingConfig},
    metrics::MetricsRegistry,
    suite::{self, Level, OperatingPoint, ProcessCorner, SampleName, SweepPlan},
    AcquisitionConfig, CollectError, Collection, Collector, ConfigError, ErrorMask, SimulatedTrng,
    WriterSink,
};

#[derive(Parser)]
#[command(name = "trng-collect")]
#[command(about = "Raw sample collection for TRNG entropy characterization")]
#[command(version = trng_characterization::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one framed collection into a file
    Collect {
        #[command(flatten)]
        source: SourceArgs,

        /// Ring oscillator length (0-3)
        #[arg(long)]
        rosc_length: Option<u32>,

        /// Sample counter value
        #[arg(long)]
        sample_count: Option<u32>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Record one file per oscillator length and sample count
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        /// Oscillator lengths to record
        #[arg(long, value_delimiter = ',', default_value = "0,1,2,3")]
        rosc_lengths: Vec<u32>,

        /// Sample counts to record
        #[arg(long, value_delimiter = ',', required = true)]
        sample_counts: Vec<u32>,

        /// Supply voltage of this run: H, T or L
        #[arg(long, default_value = "T")]
        voltage: Level,

        /// Temperature of this run: H, T or L
        #[arg(long, default_value = "T")]
        temperature: Level,

        /// Process corner of the device: T, FF, FS, SF or SS
        #[arg(long, default_value = "T")]
        corner: ProcessCorner,

        /// File name prefix
        #[arg(long, default_value = "trng")]
        prefix: String,

        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Check recorded files and, optionally, suite completeness
    Verify {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also check that the files form a complete suite
        #[arg(long)]
        suite: bool,

        /// Keep going after a bad file
        #[arg(short, long)]
        force: bool,

        /// Print header fields and body digests
        #[arg(short, long)]
        verbose: bool,

        /// Accept frames cut short by an autocorrelation failure
        #[arg(long)]
        allow_truncated: bool,
    },
}

/// Options shared by the recording commands.
#[derive(Args)]
struct SourceArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sampling mode: 0 fast, 1 full evaluation, 2 SP 800-90B
    #[arg(long)]
    mode: Option<u32>,

    /// Buffer size in bytes, header and footer included
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Give up a hardware wait after this many polls
    #[arg(long)]
    max_polls: Option<u64>,

    /// Give up a hardware wait after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Seed of the simulated register block
    #[arg(long)]
    seed: Option<u64>,

    /// Write Prometheus metrics to this file when done
    #[arg(long)]
    metrics: Option<PathBuf>,
}

impl SourceArgs {
    /// Loads the config file and applies command-line overrides.
    fn load(
        &self,
        rosc_length: Option<u32>,
        sample_count: Option<u32>,
    ) -> Result<(AcquisitionConfig, Collector<SimulatedTrng>), ConfigError> {
        let mut file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let base = file.acquisition;
        let acquisition = AcquisitionConfig::from_raw(
            self.mode.unwrap_or(base.mode().code()),
            rosc_length.unwrap_or(base.rosc_length()),
            sample_count.unwrap_or(base.sample_count()),
            self.buffer_size.unwrap_or(base.buffer_size()),
        )?;

        if self.max_polls.is_some() || self.timeout_ms.is_some() {
            file.polling = PollingConfig {
                max_attempts: self.max_polls,
                timeout_ms: self.timeout_ms,
            };
        }
        if let Some(seed) = self.seed {
            file.simulation.seed = seed;
        }

        let collector =
            Collector::with_poll_strategy(file.simulation.build(), file.polling.strategy());
        Ok((acquisition, collector))
    }

    fn write_metrics(&self, registry: &MetricsRegistry) {
        let Some(path) = &self.metrics else { return };
        let result = registry
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(path, text).map_err(|e| e.to_string()));
        match result {
            Ok(()) => info!("Metrics written to {}", path.display()),
            Err(e) => warn!("Failed to write metrics: {}", e),
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let ok = match cli.command {
        Commands::Collect {
            source,
            rosc_length,
            sample_count,
            output,
        } => run_collect(&source, rosc_length, sample_count, &output),
        Commands::Sweep {
            source,
            rosc_lengths,
            sample_counts,
            voltage,
            temperature,
            corner,
            prefix,
            out_dir,
        } => {
            let point = OperatingPoint {
                voltage,
                temperature,
                corner,
            };
            run_sweep(&source, rosc_lengths, sample_counts, point, prefix, &out_dir)
        }
        Commands::Verify {
            files,
            suite,
            force,
            verbose,
            allow_truncated,
        } => run_verify(&files, suite, force, verbose, allow_truncated),
    };

    if !ok {
        std::process::exit(1);
    }
}

fn run_collect(
    source: &SourceArgs,
    rosc_length: Option<u32>,
    sample_count: Option<u32>,
    output: &Path,
) -> bool {
    info!("TRNG Characterization v{}", trng_characterization::VERSION);

    let (config, mut collector) = match source.load(rosc_length, sample_count) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return false;
        }
    };
    let registry = match MetricsRegistry::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            return false;
        }
    };

    let file = match File::create(output) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to create {}: {}", output.display(), e);
            return false;
        }
    };
    let mut sink = WriterSink::new(BufWriter::new(file));

    let result = collector
        .run(&config, &mut sink)
        .and_then(|collection| Ok((collection, sink.into_inner()?)));

    let ok = match result {
        Ok((collection, _)) => {
            registry.record(&collection);
            info!(
                "Wrote {} blocks ({} bytes) to {}; error mask: {}",
                collection.blocks,
                collection.bytes(),
                output.display(),
                collection.mask
            );
            if collection.aborted() {
                warn!(
                    "Collection stopped early after {} of {} blocks",
                    collection.blocks, collection.requested_blocks
                );
            }
            true
        }
        Err(e) => {
            let mask = match &e {
                CollectError::BlockTimeout { mask, .. } => Some(*mask),
                _ => None,
            };
            registry.record_failure(mask);
            eprintln!("Collection failed: {}", e);
            false
        }
    };

    source.write_metrics(&registry);
    ok
}

fn run_sweep(
    source: &SourceArgs,
    rosc_lengths: Vec<u32>,
    sample_counts: Vec<u32>,
    point: OperatingPoint,
    prefix: String,
    out_dir: &Path,
) -> bool {
    let (base, mut collector) = match source.load(None, None) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return false;
        }
    };
    let registry = match MetricsRegistry::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            return false;
        }
    };

    // Set up Ctrl+C handler
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || s.store(true, Ordering::SeqCst)) {
        warn!("Ctrl+C handler unavailable: {}", e);
    }

    let plan = SweepPlan {
        base,
        rosc_lengths,
        sample_counts,
        point,
        prefix,
    };

    let ok = match suite::run_sweep(&mut collector, &plan, out_dir, &stop) {
        Ok(manifest) => {
            for run in &manifest.runs {
                registry.record(&Collection {
                    mask: ErrorMask::from_bits_retain(run.error_mask),
                    blocks: run.blocks,
                    requested_blocks: run.requested_blocks,
                });
                if run.error_mask != 0 {
                    warn!("{}: error mask {:#x}", run.file, run.error_mask);
                }
            }
            info!(
                "Recorded {} files in {}{}",
                manifest.runs.len(),
                out_dir.display(),
                if manifest.completed { "" } else { " (interrupted)" }
            );
            manifest.completed
        }
        Err(e) => {
            eprintln!("Sweep failed: {}", e);
            false
        }
    };

    source.write_metrics(&registry);
    ok
}

fn run_verify(
    files: &[PathBuf],
    check_suite: bool,
    force: bool,
    verbose: bool,
    allow_truncated: bool,
) -> bool {
    let mut bad = 0usize;

    for path in files {
        match verify_one(path, verbose, allow_truncated) {
            Ok(()) => {}
            Err(e) => {
                bad += 1;
                eprintln!("{}: {}", path.display(), e);
                if !force {
                    return false;
                }
            }
        }
    }
    info!("{} of {} files valid", files.len() - bad, files.len());

    if check_suite {
        let names = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        match suite::check_suite(names) {
            Ok(report) if report.is_complete() => {
                info!(
                    "Suite complete: {} recordings at sample counts {:?}",
                    report.recognized, report.sample_counts
                );
            }
            Ok(report) => {
                for name in &report.missing {
                    println!("missing: {}", name);
                }
                eprintln!("Suite incomplete: {} recordings missing", report.missing.len());
                return false;
            }
            Err(e) => {
                eprintln!("Suite check failed: {}", e);
                return false;
            }
        }
    }

    bad == 0
}

fn verify_one(
    path: &Path,
    verbose: bool,
    allow_truncated: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = trng_characterization::verify_frame(std::io::BufReader::new(File::open(path)?))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match SampleName::parse(&file_name) {
        Ok(name) => name.check_header(&report.header)?,
        Err(_) => warn!("{}: name does not follow the suite convention", path.display()),
    }

    report.check_clean(allow_truncated)?;
    if report.is_truncated() {
        warn!(
            "{}: {} of {} blocks (collection stopped early)",
            path.display(),
            report.blocks,
            report.expected_blocks
        );
    }
    if verbose {
        println!(
            "{}: mode {} rosc {} sample count {} buffer {} blocks {} endianness {:?} sha256 {}",
            path.display(),
            report.header.mode,
            report.header.rosc_length,
            report.header.sample_count,
            report.header.buffer_size,
            report.blocks,
            report.endianness,
            report.digest_hex()
        );
    }
    Ok(())
}
