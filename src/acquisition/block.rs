//! One EHR worth of raw entropy.

use crate::framing::format::{self, BLOCK_BYTES};
use crate::hw::{registers, RegisterBlock};

/// The six words (192 bits) the hardware produces per ready cycle.
///
/// Blocks are read, framed and dropped within one loop iteration; the
/// hardware refills its registers as soon as the last word is read.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EntropyBlock {
    words: [u32; Self::WORDS],
}

impl EntropyBlock {
    /// Words per block, one per entropy holding register.
    pub const WORDS: usize = registers::EHR_WORDS;

    /// Wraps words already read from the hardware.
    pub fn from_words(words: [u32; Self::WORDS]) -> Self {
        Self { words }
    }

    /// Reads all six entropy registers in index order.
    ///
    /// Partial reads would stall the refill, so this always reads the full set.
    pub fn read_from<R: RegisterBlock + ?Sized>(regs: &mut R) -> Self {
        let mut words = [0u32; Self::WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = regs.read_word(registers::ehr_data(index));
        }
        Self { words }
    }

    #[inline]
    /// Block words in register order.
    pub fn words(&self) -> &[u32; Self::WORDS] {
        &self.words
    }

    /// Little-endian wire bytes.
    pub fn to_le_bytes(&self) -> [u8; BLOCK_BYTES] {
        format::to_le_bytes(&self.words)
    }
}

// Contents are raw entropy; keep them out of logs.
impl std::fmt::Debug for EntropyBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyBlock").finish_non_exhaustive()
    }
}
