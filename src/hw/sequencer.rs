//! Hardware bring-up and teardown.
//!
//! The write order matters: the sample counter only latches once the reset
//! has settled and the clock runs, and the source must be enabled last.

use super::registers::{self, RegisterBlock};
use super::PollStrategy;
use crate::config::AcquisitionConfig;
use thiserror::Error;

/// The sample counter never read back the requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sample counter did not latch {requested} after {attempts} writes")]
pub struct SampleCountNotLatched {
    /// Value written to the counter.
    pub requested: u32,
    /// Write and read-back rounds made.
    pub attempts: u64,
}

/// Programs the block for sampling and enables the entropy source.
pub fn start<R: RegisterBlock + ?Sized>(
    regs: &mut R,
    config: &AcquisitionConfig,
    poll: &PollStrategy,
) -> Result<(), SampleCountNotLatched> {
    tracing::debug!("Resetting TRNG block");
    regs.write_word(registers::SW_RESET, registers::SW_RESET_SET);

    let requested = config.sample_count();
    let mut writes: u64 = 0;
    poll.spin(|| {
        writes = writes.saturating_add(1);
        regs.write_word(registers::CLK_ENABLE, registers::CLK_ENABLE_SET);
        regs.write_word(registers::SAMPLE_CNT1, requested);
        (regs.read_word(registers::SAMPLE_CNT1) == requested).then_some(())
    })
    .map_err(|timeout| SampleCountNotLatched {
        requested,
        attempts: timeout.attempts,
    })?;
    if writes > 1 {
        tracing::debug!(writes, "Sample counter latched after retries");
    }

    regs.write_word(registers::CONFIG, config.rosc_length());
    regs.write_word(registers::DEBUG_CONTROL, config.mode().bypass_mask());
    regs.write_word(registers::SOURCE_ENABLE, registers::SOURCE_ENABLE_SET);

    tracing::debug!(
        mode = %config.mode(),
        rosc_length = config.rosc_length(),
        sample_count = requested,
        "Entropy source enabled"
    );
    Ok(())
}

/// Disables the entropy source.
pub fn stop<R: RegisterBlock + ?Sized>(regs: &mut R) {
    regs.write_word(registers::SOURCE_ENABLE, registers::SOURCE_ENABLE_CLR);
    tracing::debug!("Entropy source disabled");
}
