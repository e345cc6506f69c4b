//! Register map of the TRNG block.
//!
//! Offsets are byte offsets from the block's base address. Every register
//! is 32 bits wide and word aligned.

/// Interrupt status: bit0 block ready, bit1 autocorrelation, bit2 CRNGT, bit3 Von Neumann.
pub const ISR: usize = 0x104;
/// Interrupt clear. Writing all-ones acknowledges every pending status bit.
pub const ICR: usize = 0x108;
/// Ring oscillator length (2 bits).
pub const CONFIG: usize = 0x10C;
/// Ready status. Reads [`EHR_NOT_READY`] while no block is pending.
pub const VALID: usize = 0x110;
/// First of the six consecutive entropy holding registers.
pub const EHR_DATA_0: usize = 0x114;
/// Entropy source enable.
pub const SOURCE_ENABLE: usize = 0x12C;
/// Sample counter between two consecutive oscillator samples.
pub const SAMPLE_CNT1: usize = 0x130;
/// Debug control. Selects which internal conditioning stages are bypassed.
pub const DEBUG_CONTROL: usize = 0x138;
/// Software reset.
pub const SW_RESET: usize = 0x140;
/// Clock enable.
pub const CLK_ENABLE: usize = 0x1C4;

/// Number of entropy holding registers, i.e. words per block.
pub const EHR_WORDS: usize = 6;

/// Status bit: a full block is waiting in the EHR.
pub const ISR_EHR_VALID: u32 = 0x1;
/// Status bit: autocorrelation test failed. Latched until reset.
pub const ISR_AUTOCORR_ERR: u32 = 0x2;
/// Status bit: continuous test saw two equal consecutive 16-bit blocks.
pub const ISR_CRNGT_ERR: u32 = 0x4;
/// Status bit: Von Neumann corrector saw 32 identical consecutive bits.
pub const ISR_VN_ERR: u32 = 0x8;

/// Value written to [`ICR`] to clear every status bit.
pub const ICR_CLEAR_ALL: u32 = !0;

/// [`VALID`] sentinel meaning no block is pending.
pub const EHR_NOT_READY: u32 = 0x0;

/// [`SOURCE_ENABLE`] value starting the oscillators.
pub const SOURCE_ENABLE_SET: u32 = 0x1;
/// [`SOURCE_ENABLE`] value stopping the oscillators.
pub const SOURCE_ENABLE_CLR: u32 = 0x0;
/// [`SW_RESET`] value triggering a reset.
pub const SW_RESET_SET: u32 = 0x1;
/// [`CLK_ENABLE`] value starting the block clock.
pub const CLK_ENABLE_SET: u32 = 0x1;

/// Debug control bit bypassing the Von Neumann corrector.
pub const DEBUG_VNC_BYPASS: u32 = 0x2;
/// Debug control bit bypassing the continuous (CRNGT) test.
pub const DEBUG_CRNGT_BYPASS: u32 = 0x4;
/// Debug control bit bypassing the autocorrelation test.
pub const DEBUG_AUTOCORR_BYPASS: u32 = 0x8;

/// Word-level access to a TRNG register block.
///
/// Implemented by [`MmioRegisters`](super::MmioRegisters) for real hardware
/// and by [`SimulatedTrng`](super::SimulatedTrng) for tests and demos.
/// Reads take `&mut self` because reading the entropy registers has side
/// effects on the device.
pub trait RegisterBlock {
    /// Reads the 32-bit register at `offset`.
    fn read_word(&mut self, offset: usize) -> u32;

    /// Writes `value` to the 32-bit register at `offset`.
    fn write_word(&mut self, offset: usize, value: u32);
}

impl<R: RegisterBlock + ?Sized> RegisterBlock for &mut R {
    #[inline]
    fn read_word(&mut self, offset: usize) -> u32 {
        (**self).read_word(offset)
    }

    #[inline]
    fn write_word(&mut self, offset: usize, value: u32) {
        (**self).write_word(offset, value)
    }
}

/// Offset of entropy holding register `index`.
#[inline]
pub const fn ehr_data(index: usize) -> usize {
    EHR_DATA_0 + index * core::mem::size_of::<u32>()
}
