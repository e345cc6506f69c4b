//! The acquisition engine.
//!
//! One collection runs validation, hardware bring-up, the block loop and
//! framing in strict sequence:
//!
//! ```text
//! validate → sequencer::start → [poll → classify → extract → frame]* → footer → sequencer::stop
//! ```
//!
//! Hardware conditions never abort the call with an error. They are folded
//! into an [`ErrorMask`] returned once at the end. The only hard stop is an
//! autocorrelation failure, after which the frame is closed early.

mod block;
mod error_mask;

pub use block::EntropyBlock;
pub use error_mask::ErrorMask;

use crate::config::{AcquisitionConfig, ConfigError};
use crate::framing::{OutputFramer, Sink};
use crate::hw::{registers, sequencer, PollStrategy, RegisterBlock};
use std::io;
use thiserror::Error;

/// Errors that end a collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A parameter check failed before the hardware was touched.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// The sample counter never read back the configured value.
    #[error(transparent)]
    SampleCountNotLatched(#[from] sequencer::SampleCountNotLatched),
    /// A block never became ready within the poll limit. The footer was
    /// still emitted.
    #[error("block {block} never became ready after {attempts} polls ({emitted} blocks emitted)")]
    BlockTimeout {
        /// Index of the block being waited for.
        block: u32,
        /// Status polls spent on it.
        attempts: u64,
        /// Blocks written before giving up.
        emitted: u32,
        /// Errors seen up to the timeout.
        mask: ErrorMask,
    },
    /// The sink rejected a write.
    #[error("output sink failed: {0}")]
    Sink(#[from] io::Error),
}

impl CollectError {
    /// Legacy negative status code for parameter errors.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::InvalidConfig(e) => e.code(),
            _ => None,
        }
    }
}

/// Outcome of one iteration of the block loop.
#[derive(Debug)]
enum BlockOutcome {
    Extracted(EntropyBlock),
    Aborted,
}

/// Result of a completed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    /// Cumulative hardware error flags, unmasked.
    pub mask: ErrorMask,
    /// Body blocks streamed to the sink.
    pub blocks: u32,
    /// Body blocks the buffer size called for.
    pub requested_blocks: u32,
}

impl Collection {
    /// True when an autocorrelation failure cut the body short.
    pub fn aborted(&self) -> bool {
        self.blocks < self.requested_blocks
    }

    /// Bytes streamed to the sink, header and footer included.
    pub fn bytes(&self) -> u64 {
        use crate::framing::format::{BLOCK_BYTES, FOOTER_BYTES, HEADER_BYTES};
        (HEADER_BYTES + FOOTER_BYTES) as u64 + self.blocks as u64 * BLOCK_BYTES as u64
    }
}

/// Drives collections on a register block it owns exclusively.
#[derive(Debug)]
pub struct Collector<R> {
    regs: R,
    poll: PollStrategy,
}

impl<R: RegisterBlock> Collector<R> {
    /// Creates a collector whose hardware waits never give up.
    pub fn new(regs: R) -> Self {
        Self::with_poll_strategy(regs, PollStrategy::Unbounded)
    }

    /// Creates a collector whose hardware waits follow `poll`.
    pub fn with_poll_strategy(regs: R, poll: PollStrategy) -> Self {
        Self { regs, poll }
    }

    /// Borrows the register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Releases the register block.
    pub fn into_registers(self) -> R {
        self.regs
    }

    /// Runs one collection, streaming the frame into `sink`.
    ///
    /// The source is disabled before returning on every path that enabled it.
    pub fn run<S: Sink + ?Sized>(
        &mut self,
        config: &AcquisitionConfig,
        sink: &mut S,
    ) -> Result<Collection, CollectError> {
        let requested_blocks = config.block_count();
        tracing::info!(
            mode = %config.mode(),
            rosc_length = config.rosc_length(),
            sample_count = config.sample_count(),
            buffer_size = config.buffer_size(),
            blocks = requested_blocks,
            "Starting TRNG collection"
        );

        sequencer::start(&mut self.regs, config, &self.poll)?;
        let result = self.stream(config, sink);
        sequencer::stop(&mut self.regs);

        match &result {
            Ok(collection) => tracing::info!(
                blocks = collection.blocks,
                errors = %collection.mask,
                "TRNG collection finished"
            ),
            Err(e) => tracing::error!(error = %e, "TRNG collection failed"),
        }
        result
    }

    fn stream<S: Sink + ?Sized>(
        &mut self,
        config: &AcquisitionConfig,
        sink: &mut S,
    ) -> Result<Collection, CollectError> {
        let requested_blocks = config.block_count();
        let mut framer = OutputFramer::begin(sink, config)?;
        let mut mask = ErrorMask::empty();

        for index in 0..requested_blocks {
            let outcome = match self.next_block(index, &mut mask) {
                Ok(outcome) => outcome,
                Err(attempts) => {
                    let emitted = framer.finish(mask)?;
                    return Err(CollectError::BlockTimeout {
                        block: index,
                        attempts,
                        emitted,
                        mask,
                    });
                }
            };

            match outcome {
                BlockOutcome::Extracted(block) => framer.block(&block)?,
                BlockOutcome::Aborted => {
                    tracing::error!(
                        block = index,
                        "Autocorrelation error; entropy source halted until reset"
                    );
                    break;
                }
            }
        }

        let blocks = framer.finish(mask)?;
        Ok(Collection {
            mask,
            blocks,
            requested_blocks,
        })
    }

    /// Waits for block `index`, classifies its status and extracts it.
    ///
    /// Returns the number of polls made if the poll strategy gave up.
    fn next_block(&mut self, index: u32, mask: &mut ErrorMask) -> Result<BlockOutcome, u64> {
        let regs = &mut self.regs;
        let ready_at_entry = regs.read_word(registers::VALID);

        let status = self.poll.spin(|| {
            let status = regs.read_word(registers::ISR);
            (status & (registers::ISR_EHR_VALID | registers::ISR_AUTOCORR_ERR) != 0)
                .then_some(status)
        });

        if index != 0 && ready_at_entry != registers::EHR_NOT_READY {
            if !mask.contains(ErrorMask::SAMPLE_LOST) {
                tracing::warn!(block = index, "Samples lost; host is slower than the sampling rate");
            }
            *mask |= ErrorMask::SAMPLE_LOST;
        }
        let status = status.map_err(|timeout| timeout.attempts)?;
        mask.record_status(status);

        if mask.is_irrecoverable() {
            return Ok(BlockOutcome::Aborted);
        }

        regs.write_word(registers::ICR, registers::ICR_CLEAR_ALL);
        let block = EntropyBlock::read_from(regs);
        tracing::trace!(block = index, "Block extracted (status {status:#x})");
        Ok(BlockOutcome::Extracted(block))
    }
}

/// Collects one frame from `regs` into `sink` with raw parameters.
///
/// Parameters are validated in the order mode, oscillator length, sample
/// count, buffer size, sink before any register is touched. Returns the
/// full cumulative error mask; the footer only carries its sample-lost bit.
pub fn collect<R, S>(
    regs: &mut R,
    mode: u32,
    rosc_length: u32,
    sample_count: u32,
    buffer_size: u32,
    sink: Option<&mut S>,
) -> Result<ErrorMask, CollectError>
where
    R: RegisterBlock + ?Sized,
    S: Sink + ?Sized,
{
    let config = AcquisitionConfig::from_raw(mode, rosc_length, sample_count, buffer_size)?;
    let sink = sink.ok_or(ConfigError::NullSink)?;
    Collector::new(regs)
        .run(&config, sink)
        .map(|collection| collection.mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrngMode;
    use crate::hw::{BlockEvent, SimulatedTrng};

    fn run(sim: SimulatedTrng, buffer_size: u32) -> (Collection, Vec<Vec<u8>>, SimulatedTrng) {
        let config = AcquisitionConfig::new(TrngMode::FullEvaluation, 1, 100, buffer_size).unwrap();
        let mut chunks = Vec::new();
        let mut collector = Collector::new(sim);
        let collection = collector
            .run(&config, &mut |chunk: &[u8]| chunks.push(chunk.to_vec()))
            .unwrap();
        (collection, chunks, collector.into_registers())
    }

    #[test]
    fn test_clean_collection() {
        let (collection, chunks, sim) = run(SimulatedTrng::new(1), 124);

        assert_eq!(collection.mask, ErrorMask::empty());
        assert_eq!(collection.blocks, 4);
        assert!(!collection.aborted());
        assert_eq!(collection.bytes(), 124);
        assert_eq!(chunks.len(), 6);
        assert_eq!(sim.blocks_delivered(), 4);
        assert_eq!(sim.acknowledgements(), 4);
        assert!(!sim.is_source_enabled());
    }

    #[test]
    fn test_crngt_and_von_neumann_do_not_stop() {
        let sim = SimulatedTrng::new(1)
            .with_event_at(
                1,
                BlockEvent::Ready {
                    delay_polls: 3,
                    flags: registers::ISR_CRNGT_ERR,
                },
            )
            .with_event_at(
                2,
                BlockEvent::Ready {
                    delay_polls: 0,
                    flags: registers::ISR_VN_ERR,
                },
            );
        let (collection, chunks, _) = run(sim, 124);

        assert_eq!(collection.mask, ErrorMask::CRNGT | ErrorMask::VON_NEUMANN);
        assert_eq!(collection.blocks, 4);
        assert_eq!(chunks.last().unwrap()[4..8], [0, 0, 0, 0]);
    }

    #[test]
    fn test_autocorrelation_mid_run() {
        let sim = SimulatedTrng::new(1).with_event_at(2, BlockEvent::Autocorrelation);
        let (collection, chunks, sim) = run(sim, 124);

        assert!(collection.mask.is_irrecoverable());
        assert_eq!(collection.blocks, 2);
        assert!(collection.aborted());
        // header + 2 blocks + footer
        assert_eq!(chunks.len(), 4);
        // the failing block is neither acknowledged nor read
        assert_eq!(sim.acknowledgements(), 2);
        assert_eq!(sim.blocks_delivered(), 2);
        assert!(!sim.is_source_enabled());
    }

    #[test]
    fn test_overrun_on_first_block_is_not_loss() {
        let sim = SimulatedTrng::new(1).with_event_at(0, BlockEvent::Overrun);
        let (collection, _, _) = run(sim, 124);
        assert_eq!(collection.mask, ErrorMask::empty());
    }

    #[test]
    fn test_block_timeout_still_closes_frame() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 124).unwrap();
        let sim = SimulatedTrng::new(1).with_event_at(1, BlockEvent::Stall);
        let mut collector = Collector::with_poll_strategy(sim, PollStrategy::MaxAttempts(100));
        let mut chunks = Vec::new();

        let err = collector
            .run(&config, &mut |chunk: &[u8]| chunks.push(chunk.to_vec()))
            .unwrap_err();

        assert!(matches!(
            err,
            CollectError::BlockTimeout {
                block: 1,
                attempts: 100,
                emitted: 1,
                ..
            }
        ));
        assert_eq!(chunks.len(), 3);
        assert!(!collector.registers().is_source_enabled());
    }

    /// Reports a block waiting in the EHR after the first acknowledgement,
    /// but never raises its ready status.
    struct ReadyButSilent(SimulatedTrng);

    impl RegisterBlock for ReadyButSilent {
        fn read_word(&mut self, offset: usize) -> u32 {
            if self.0.acknowledgements() == 0 || !self.0.is_source_enabled() {
                return self.0.read_word(offset);
            }
            match offset {
                registers::VALID => 1,
                registers::ISR => 0,
                _ => self.0.read_word(offset),
            }
        }

        fn write_word(&mut self, offset: usize, value: u32) {
            self.0.write_word(offset, value)
        }
    }

    #[test]
    fn test_block_timeout_keeps_sample_loss() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 124).unwrap();
        let regs = ReadyButSilent(SimulatedTrng::new(1));
        let mut collector = Collector::with_poll_strategy(regs, PollStrategy::MaxAttempts(10));
        let mut chunks = Vec::new();

        let err = collector
            .run(&config, &mut |chunk: &[u8]| chunks.push(chunk.to_vec()))
            .unwrap_err();

        match err {
            CollectError::BlockTimeout {
                block,
                emitted,
                mask,
                ..
            } => {
                assert_eq!(block, 1);
                assert_eq!(emitted, 1);
                assert_eq!(mask, ErrorMask::SAMPLE_LOST);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(chunks.last().unwrap()[4..8], [1, 0, 0, 0]);
    }

    #[test]
    fn test_sink_failure_disables_source() {
        struct FailAfter(u32);
        impl Sink for FailAfter {
            fn write_chunk(&mut self, _chunk: &[u8]) -> io::Result<()> {
                if self.0 == 0 {
                    return Err(io::Error::new(io::ErrorKind::Other, "full"));
                }
                self.0 -= 1;
                Ok(())
            }
        }

        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 124).unwrap();
        let mut collector = Collector::new(SimulatedTrng::new(1));
        let err = collector.run(&config, &mut FailAfter(2)).unwrap_err();

        assert!(matches!(err, CollectError::Sink(_)));
        assert!(!collector.registers().is_source_enabled());
    }

    #[test]
    fn test_null_sink_rejected_before_hardware() {
        let mut sim = SimulatedTrng::new(1);
        let err = collect::<_, WriterSinkAlias>(&mut sim, 0, 0, 1, 52, None).unwrap_err();
        assert_eq!(err.code(), Some(-5));
        assert!(sim.writes().is_empty());
    }

    type WriterSinkAlias = crate::framing::WriterSink<Vec<u8>>;
}
