//! TRNG Characterization Library
//!
//! Collects raw, unconditioned samples from a memory-mapped ring-oscillator
//! TRNG block for SP 800-90B / AIS-31 entropy assessment. Each collection
//! streams a self-describing frame (header, 192-bit blocks, footer) into a
//! caller-supplied sink and reports the hardware error conditions it saw.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! config → hw::sequencer::start → acquisition (poll → classify → extract) → framing → sink
//!                                          ↓
//!                                  ErrorMask → metrics
//! ```
//!
//! Recorded frames can be checked offline with [`verify_frame`] and grouped
//! into characterization suites with the [`suite`] module.
//!
//! # Design Principles
//!
//! - **Raw samples only**: no conditioning, health testing or estimation
//! - **Errors are data**: hardware faults land in the [`ErrorMask`], not in panics
//! - **Source always disabled**: every collection path that enabled the
//!   entropy source turns it off again
//! - **Hardware is a capability**: the same engine drives MMIO registers or
//!   the [`SimulatedTrng`]
//!
//! # Example
//!
//! ```no_run
//! use trng_characterization::{
//!     AcquisitionConfig, Collector, SimulatedTrng, TrngMode, WriterSink,
//! };
//!
//! let config = AcquisitionConfig::new(TrngMode::Sp80090b, 0, 1000, 1 << 16).unwrap();
//! let mut collector = Collector::new(SimulatedTrng::new(42));
//!
//! let mut sink = WriterSink::new(Vec::new());
//! let collection = collector.run(&config, &mut sink).unwrap();
//!
//! println!("{} blocks, errors: {}", collection.blocks, collection.mask);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod config;
pub mod framing;
pub mod hw;
pub mod metrics;
pub mod suite;

// Re-export commonly used types at crate root
pub use acquisition::{collect, CollectError, Collection, Collector, EntropyBlock, ErrorMask};
pub use config::{AcquisitionConfig, ConfigError, FileConfig, TrngMode};
pub use framing::{verify_bytes, verify_frame, FrameReport, OutputFramer, Sink, WriterSink};
pub use hw::{BlockEvent, MmioRegisters, PollStrategy, RegisterBlock, SimulatedTrng};
pub use metrics::MetricsRegistry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
