//! Wire format of a collection.
//!
//! ```text
//! header: [0xAABBCCDD, mode[31:30] | rosc[25:24] | buffer_size[23:0], sample_count, 0xAABBCCDD]
//! body:   N x 6 words
//! footer: [0xDDCCBBAA, error & SAMPLE_LOST, 0xDDCCBBAA]
//! ```
//!
//! All words are emitted little-endian.

use crate::acquisition::{ErrorMask, EntropyBlock};
use crate::config::AcquisitionConfig;

/// Words in the header.
pub const HEADER_WORDS: u32 = 4;
/// Words in the footer.
pub const FOOTER_WORDS: u32 = 3;
/// Header and footer words together.
pub const OVERHEAD_WORDS: u32 = HEADER_WORDS + FOOTER_WORDS;
/// Words in one body block.
pub const BLOCK_WORDS: u32 = EntropyBlock::WORDS as u32;

const WORD_BYTES: u32 = core::mem::size_of::<u32>() as u32;

/// Header size in bytes.
pub const HEADER_BYTES: usize = (HEADER_WORDS * WORD_BYTES) as usize;
/// Footer size in bytes.
pub const FOOTER_BYTES: usize = (FOOTER_WORDS * WORD_BYTES) as usize;
/// Body block size in bytes.
pub const BLOCK_BYTES: usize = (BLOCK_WORDS * WORD_BYTES) as usize;

/// Smallest buffer holding a header, one block and a footer.
pub const MIN_BUFFER_BYTES: u32 = (OVERHEAD_WORDS + BLOCK_WORDS) * WORD_BYTES;
/// Exclusive upper bound; the size must fit the 24-bit header field.
pub const MAX_BUFFER_BYTES: u32 = 1 << 24;

/// First and last word of the header.
pub const HEADER_SIGNATURE: u32 = 0xAABB_CCDD;
/// First and last word of the footer.
pub const FOOTER_SIGNATURE: u32 = 0xDDCC_BBAA;

/// Position of the mode in the packed header word.
pub const MODE_SHIFT: u32 = 30;
/// Mode bits of the packed header word.
pub const MODE_MASK: u32 = 0b11 << MODE_SHIFT;
/// Position of the oscillator length in the packed header word.
pub const ROSC_SHIFT: u32 = 24;
/// Oscillator length bits of the packed header word.
pub const ROSC_MASK: u32 = 0b11 << ROSC_SHIFT;
/// Buffer size bits of the packed header word.
pub const BUFFER_SIZE_MASK: u32 = MAX_BUFFER_BYTES - 1;

/// Number of body blocks that fit in `buffer_size` bytes after the overhead.
///
/// Returns 0 for buffers too small to hold the overhead.
pub fn block_count(buffer_size: u32) -> u32 {
    (buffer_size / WORD_BYTES).saturating_sub(OVERHEAD_WORDS) / BLOCK_WORDS
}

/// Packs mode, oscillator length and buffer size into the header flags word.
pub fn pack_flags(config: &AcquisitionConfig) -> u32 {
    (config.mode().code() << MODE_SHIFT)
        | (config.rosc_length() << ROSC_SHIFT)
        | (config.buffer_size() & BUFFER_SIZE_MASK)
}

/// Splits a header flags word into raw (mode, rosc length, buffer size).
pub fn unpack_flags(flags: u32) -> (u32, u32, u32) {
    (
        (flags & MODE_MASK) >> MODE_SHIFT,
        (flags & ROSC_MASK) >> ROSC_SHIFT,
        flags & BUFFER_SIZE_MASK,
    )
}

/// Header words for `config`.
pub fn header_words(config: &AcquisitionConfig) -> [u32; HEADER_WORDS as usize] {
    [
        HEADER_SIGNATURE,
        pack_flags(config),
        config.sample_count(),
        HEADER_SIGNATURE,
    ]
}

/// Footer words. Only the sample-lost bit of `mask` is persisted.
pub fn footer_words(mask: ErrorMask) -> [u32; FOOTER_WORDS as usize] {
    [FOOTER_SIGNATURE, mask.footer_word(), FOOTER_SIGNATURE]
}

/// Serializes words little-endian into a fixed-size byte array.
pub fn to_le_bytes<const W: usize, const B: usize>(words: &[u32; W]) -> [u8; B] {
    debug_assert_eq!(W * 4, B);
    let mut bytes = [0u8; B];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrngMode;
    use proptest::prelude::*;

    #[test]
    fn test_min_buffer_is_derived() {
        assert_eq!(MIN_BUFFER_BYTES, 52);
        assert_eq!(block_count(MIN_BUFFER_BYTES), 1);
        assert_eq!(block_count(MIN_BUFFER_BYTES - 1), 0);
    }

    #[test]
    fn test_pack_flags_layout() {
        let config = AcquisitionConfig::new(TrngMode::Sp80090b, 3, 10, 0x00AB_CDEF).unwrap();
        assert_eq!(pack_flags(&config), 0x83AB_CDEF);
        assert_eq!(unpack_flags(0x83AB_CDEF), (2, 3, 0x00AB_CDEF));
    }

    #[test]
    fn test_footer_keeps_only_sample_lost() {
        let mask = ErrorMask::SAMPLE_LOST | ErrorMask::AUTOCORRELATION | ErrorMask::CRNGT;
        assert_eq!(footer_words(mask), [FOOTER_SIGNATURE, 1, FOOTER_SIGNATURE]);
        assert_eq!(
            footer_words(ErrorMask::VON_NEUMANN),
            [FOOTER_SIGNATURE, 0, FOOTER_SIGNATURE]
        );
    }

    #[test]
    fn test_le_serialization() {
        let bytes: [u8; 8] = to_le_bytes(&[HEADER_SIGNATURE, 1]);
        assert_eq!(bytes, [0xDD, 0xCC, 0xBB, 0xAA, 1, 0, 0, 0]);
    }

    proptest! {
        #[test]
        fn prop_block_count_fits_buffer(size in MIN_BUFFER_BYTES..MAX_BUFFER_BYTES) {
            let blocks = block_count(size);
            prop_assert!(blocks >= 1);
            prop_assert_eq!(blocks, (size / 4 - 7) / 6);
            let used = (OVERHEAD_WORDS + blocks * BLOCK_WORDS) * 4;
            prop_assert!(used <= size);
            prop_assert!(size - used < BLOCK_BYTES as u32 + 4);
        }

        #[test]
        fn prop_flags_fields_are_disjoint(
            mode in 0u32..3,
            rosc in 0u32..4,
            size in MIN_BUFFER_BYTES..MAX_BUFFER_BYTES,
        ) {
            let config = AcquisitionConfig::from_raw(mode, rosc, 1, size).unwrap();
            prop_assert_eq!(unpack_flags(pack_flags(&config)), (mode, rosc, size));
        }
    }
}
