//! Prometheus metrics for TRNG collections.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `trng_collections_total` - Completed collections
//! - `trng_collections_failed_total` - Collections ended by a timeout or sink failure
//! - `trng_last_error_mask` - Error mask of the most recent collection
//!
//! ## Output Metrics
//! - `trng_blocks_total` - Entropy blocks streamed
//! - `trng_bytes_total` - Framed bytes streamed
//!
//! ## Hardware Error Metrics
//! - `trng_sample_lost_total` - Collections with sample loss
//! - `trng_autocorrelation_aborts_total` - Collections cut short by autocorrelation
//! - `trng_crngt_errors_total` - Collections with a CRNGT failure
//! - `trng_von_neumann_errors_total` - Collections with a Von Neumann failure
//!
//! # Example
//!
//! ```no_run
//! use trng_characterization::{Collector, SimulatedTrng, AcquisitionConfig};
//! use trng_characterization::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let mut collector = Collector::new(SimulatedTrng::new(0));
//! let collection = collector
//!     .run(&AcquisitionConfig::default(), &mut |_chunk: &[u8]| {})
//!     .unwrap();
//!
//! registry.record(&collection);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
