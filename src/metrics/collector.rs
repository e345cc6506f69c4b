//! Metrics collection and registry.

use crate::acquisition::{Collection, ErrorMask};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for TRNG collections.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    collections_total: IntCounter,
    collections_failed_total: IntCounter,
    last_error_mask: IntGauge,

    // Output metrics
    blocks_total: IntCounter,
    bytes_total: IntCounter,

    // Hardware error metrics
    sample_lost_total: IntCounter,
    autocorrelation_aborts_total: IntCounter,
    crngt_errors_total: IntCounter,
    von_neumann_errors_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all collection metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let collections_total = IntCounter::new(
            "trng_collections_total",
            "Total number of completed TRNG collections",
        )?;
        let collections_failed_total = IntCounter::new(
            "trng_collections_failed_total",
            "Collections that ended with a timeout or sink failure",
        )?;
        let last_error_mask = IntGauge::new(
            "trng_last_error_mask",
            "Cumulative error mask of the most recent collection",
        )?;

        let blocks_total = IntCounter::new(
            "trng_blocks_total",
            "Total 192-bit entropy blocks streamed",
        )?;
        let bytes_total = IntCounter::new(
            "trng_bytes_total",
            "Total framed bytes streamed, header and footer included",
        )?;

        let sample_lost_total = IntCounter::new(
            "trng_sample_lost_total",
            "Collections in which samples were lost",
        )?;
        let autocorrelation_aborts_total = IntCounter::new(
            "trng_autocorrelation_aborts_total",
            "Collections cut short by an autocorrelation error",
        )?;
        let crngt_errors_total = IntCounter::new(
            "trng_crngt_errors_total",
            "Collections in which the CRNGT reported a failure",
        )?;
        let von_neumann_errors_total = IntCounter::new(
            "trng_von_neumann_errors_total",
            "Collections in which the Von Neumann corrector reported a failure",
        )?;

        registry.register(Box::new(collections_total.clone()))?;
        registry.register(Box::new(collections_failed_total.clone()))?;
        registry.register(Box::new(last_error_mask.clone()))?;
        registry.register(Box::new(blocks_total.clone()))?;
        registry.register(Box::new(bytes_total.clone()))?;
        registry.register(Box::new(sample_lost_total.clone()))?;
        registry.register(Box::new(autocorrelation_aborts_total.clone()))?;
        registry.register(Box::new(crngt_errors_total.clone()))?;
        registry.register(Box::new(von_neumann_errors_total.clone()))?;

        Ok(Self {
            registry,
            collections_total,
            collections_failed_total,
            last_error_mask,
            blocks_total,
            bytes_total,
            sample_lost_total,
            autocorrelation_aborts_total,
            crngt_errors_total,
            von_neumann_errors_total,
        })
    }

    /// Records a completed collection.
    pub fn record(&self, collection: &Collection) {
        self.collections_total.inc();
        self.blocks_total.inc_by(collection.blocks as u64);
        self.bytes_total.inc_by(collection.bytes());
        self.record_mask(collection.mask);
    }

    /// Records a collection that ended with an error.
    ///
    /// `mask` is the error mask accumulated before the failure, if known.
    pub fn record_failure(&self, mask: Option<ErrorMask>) {
        self.collections_failed_total.inc();
        if let Some(mask) = mask {
            self.record_mask(mask);
        }
    }

    fn record_mask(&self, mask: ErrorMask) {
        self.last_error_mask.set(mask.bits() as i64);
        if mask.contains(ErrorMask::SAMPLE_LOST) {
            self.sample_lost_total.inc();
        }
        if mask.contains(ErrorMask::AUTOCORRELATION) {
            self.autocorrelation_aborts_total.inc();
        }
        if mask.contains(ErrorMask::CRNGT) {
            self.crngt_errors_total.inc();
        }
        if mask.contains(ErrorMask::VON_NEUMANN) {
            self.von_neumann_errors_total.inc();
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_record_collection() {
        let registry = MetricsRegistry::new().unwrap();

        registry.record(&Collection {
            mask: ErrorMask::SAMPLE_LOST | ErrorMask::CRNGT,
            blocks: 4,
            requested_blocks: 4,
        });
        registry.record(&Collection {
            mask: ErrorMask::AUTOCORRELATION,
            blocks: 1,
            requested_blocks: 4,
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("trng_collections_total 2"));
        assert!(output.contains("trng_blocks_total 5"));
        assert!(output.contains("trng_bytes_total 176"));
        assert!(output.contains("trng_sample_lost_total 1"));
        assert!(output.contains("trng_crngt_errors_total 1"));
        assert!(output.contains("trng_autocorrelation_aborts_total 1"));
        assert!(output.contains("trng_last_error_mask 2"));
    }

    #[test]
    fn test_record_failure() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_failure(Some(ErrorMask::VON_NEUMANN));
        registry.record_failure(None);

        let output = registry.encode().unwrap();
        assert!(output.contains("trng_collections_failed_total 2"));
        assert!(output.contains("trng_von_neumann_errors_total 1"));
        assert!(output.contains("trng_collections_total 0"));
    }
}
