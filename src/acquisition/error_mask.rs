//! Cumulative hardware error flags of a collection.

use crate::hw::registers;
use std::fmt;

bitflags::bitflags! {
    /// Error bits accumulated over one collection.
    ///
    /// Bits 1 and up mirror the interrupt status register. Bit 0 is reused
    /// for sample loss because the status register's bit 0 is the block
    /// ready flag, not an error. Unnamed hardware bits are kept as reported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorMask: u32 {
        /// The host did not drain a block before the hardware overwrote it.
        const SAMPLE_LOST = 0x1;
        /// Autocorrelation test failed. The source stays dead until reset.
        const AUTOCORRELATION = registers::ISR_AUTOCORR_ERR;
        /// Continuous random number generator test failed.
        const CRNGT = registers::ISR_CRNGT_ERR;
        /// Von Neumann corrector saw a long run of identical bits.
        const VON_NEUMANN = registers::ISR_VN_ERR;

        const _ = !0;
    }
}

impl ErrorMask {
    /// Folds an interrupt status word in, ignoring its block ready bit.
    pub fn record_status(&mut self, status: u32) {
        *self |= Self::from_bits_retain(status & !Self::SAMPLE_LOST.bits());
    }

    /// True once an error that ends the collection has been seen.
    #[inline]
    pub fn is_irrecoverable(&self) -> bool {
        self.contains(Self::AUTOCORRELATION)
    }

    /// Error word persisted in the frame footer.
    #[inline]
    pub fn footer_word(&self) -> u32 {
        (*self & Self::SAMPLE_LOST).bits()
    }
}

impl Default for ErrorMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for ErrorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        let unnamed = self.bits() & !Self::all_named().bits();
        if unnamed != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{unnamed:#x}")?;
        }
        Ok(())
    }
}

impl ErrorMask {
    fn all_named() -> Self {
        Self::SAMPLE_LOST | Self::AUTOCORRELATION | Self::CRNGT | Self::VON_NEUMANN
    }
}
