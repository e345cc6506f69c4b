//! Verification of recorded frames.
//!
//! Recordings may come from hosts of either endianness; the byte order is
//! detected from the first header signature.

use super::format::{
    self, BLOCK_BYTES, FOOTER_SIGNATURE, FOOTER_WORDS, HEADER_SIGNATURE, HEADER_WORDS,
};
use crate::config::TrngMode;
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use thiserror::Error;

/// Byte order of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Written by a little-endian host.
    Little,
    /// Written by a big-endian host.
    Big,
}

impl Endianness {
    fn word(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        }
    }
}

/// Errors found while verifying a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Reading the recording failed.
    #[error("failed to read frame: {0}")]
    Io(#[from] io::Error),
    /// First word is neither byte order of the start signature.
    #[error("bad magic word {0:#010x}; cannot determine endianness")]
    BadMagic(u32),
    /// A signature word is wrong.
    #[error("{what} signature mismatch at offset {offset:#x}: found {found:#010x}")]
    Signature {
        /// Which signature.
        what: &'static str,
        /// Byte offset of the word.
        offset: usize,
        /// Word found there.
        found: u32,
    },
    /// Mode bits do not name a mode.
    #[error("header carries invalid mode {0}")]
    InvalidMode(u32),
    /// Byte length is not a multiple of four.
    #[error("stream length {0} is not a whole number of words")]
    UnalignedLength(usize),
    /// Body ends inside a block.
    #[error("body of {0} bytes is not a whole number of blocks")]
    PartialBlock(usize),
    /// More blocks than the header buffer size allows.
    #[error("body holds {found} blocks but the header allows at most {expected}")]
    TooManyBlocks {
        /// Blocks in the body.
        found: u32,
        /// Limit from the header.
        expected: u32,
    },
    /// Footer error word has unknown bits.
    #[error("footer error word {0:#x} has bits beyond sample-lost")]
    InvalidErrorWord(u32),
    /// Shorter than header plus footer.
    #[error("stream too short for header and footer ({0} bytes)")]
    Truncated(usize),
    /// Footer reports sample loss.
    #[error("sample-lost flag set in footer")]
    SamplesLost,
    /// Fewer blocks than the header buffer size calls for.
    #[error("collection stopped early: {blocks} of {expected} blocks")]
    Incomplete {
        /// Blocks in the body.
        blocks: u32,
        /// Blocks a full collection writes.
        expected: u32,
    },
}

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Sampling mode.
    pub mode: TrngMode,
    /// Ring oscillator length.
    pub rosc_length: u32,
    /// Buffer size the collection was configured with.
    pub buffer_size: u32,
    /// Sample counter value.
    pub sample_count: u32,
}

/// Summary of a verified frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Byte order of the recording.
    pub endianness: Endianness,
    /// Decoded header.
    pub header: FrameHeader,
    /// Body blocks present.
    pub blocks: u32,
    /// Body blocks the buffer size called for.
    pub expected_blocks: u32,
    /// Footer sample-lost flag.
    pub sample_lost: bool,
    /// SHA-256 of the body bytes as stored.
    pub body_digest: [u8; 32],
}

impl FrameReport {
    /// True when the collection ended before filling the buffer.
    pub fn is_truncated(&self) -> bool {
        self.blocks < self.expected_blocks
    }

    /// True for a complete frame with no sample loss.
    pub fn is_clean(&self) -> bool {
        !self.is_truncated() && !self.sample_lost
    }

    /// Rejects frames with lost samples and, unless `allow_truncated`,
    /// frames whose body stops short of the buffer size.
    pub fn check_clean(&self, allow_truncated: bool) -> Result<(), FrameError> {
        if self.sample_lost {
            return Err(FrameError::SamplesLost);
        }
        if self.is_truncated() && !allow_truncated {
            return Err(FrameError::Incomplete {
                blocks: self.blocks,
                expected: self.expected_blocks,
            });
        }
        Ok(())
    }

    /// Hex form of the body digest.
    pub fn digest_hex(&self) -> String {
        self.body_digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Reads and checks a complete frame.
pub fn verify_frame<R: Read>(mut reader: R) -> Result<FrameReport, FrameError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    verify_bytes(&bytes)
}

/// Checks a complete frame held in memory.
pub fn verify_bytes(bytes: &[u8]) -> Result<FrameReport, FrameError> {
    let overhead = ((HEADER_WORDS + FOOTER_WORDS) * 4) as usize;
    if bytes.len() < overhead {
        return Err(FrameError::Truncated(bytes.len()));
    }
    if bytes.len() % 4 != 0 {
        return Err(FrameError::UnalignedLength(bytes.len()));
    }

    let endianness = detect_endianness(bytes)?;
    let word_at = |offset: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        endianness.word(raw)
    };
    let expect = |what: &'static str, offset: usize, signature: u32| {
        let found = word_at(offset);
        if found == signature {
            Ok(())
        } else {
            Err(FrameError::Signature {
                what,
                offset,
                found,
            })
        }
    };

    expect("header", 12, HEADER_SIGNATURE)?;
    let (mode, rosc_length, buffer_size) = format::unpack_flags(word_at(4));
    let mode = TrngMode::try_from(mode).map_err(|_| FrameError::InvalidMode(mode))?;
    let header = FrameHeader {
        mode,
        rosc_length,
        buffer_size,
        sample_count: word_at(8),
    };

    let footer_start = bytes.len() - (FOOTER_WORDS * 4) as usize;
    expect("footer", footer_start, FOOTER_SIGNATURE)?;
    expect("footer", footer_start + 8, FOOTER_SIGNATURE)?;
    let error_word = word_at(footer_start + 4);
    if error_word & !1 != 0 {
        return Err(FrameError::InvalidErrorWord(error_word));
    }

    let body = &bytes[(HEADER_WORDS * 4) as usize..footer_start];
    if body.len() % BLOCK_BYTES != 0 {
        return Err(FrameError::PartialBlock(body.len()));
    }
    let blocks = (body.len() / BLOCK_BYTES) as u32;
    let expected_blocks = format::block_count(buffer_size);
    if blocks > expected_blocks {
        return Err(FrameError::TooManyBlocks {
            found: blocks,
            expected: expected_blocks,
        });
    }

    let mut body_digest = [0u8; 32];
    body_digest.copy_from_slice(&Sha256::digest(body));

    Ok(FrameReport {
        endianness,
        header,
        blocks,
        expected_blocks,
        sample_lost: error_word == 1,
        body_digest,
    })
}

fn detect_endianness(bytes: &[u8]) -> Result<Endianness, FrameError> {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    match u32::from_le_bytes(magic) {
        HEADER_SIGNATURE => Ok(Endianness::Little),
        FOOTER_SIGNATURE => Ok(Endianness::Big),
        other => Err(FrameError::BadMagic(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{EntropyBlock, ErrorMask};
    use crate::config::AcquisitionConfig;
    use crate::framing::{OutputFramer, WriterSink};

    fn record(config: &AcquisitionConfig, blocks: u32, mask: ErrorMask) -> Vec<u8> {
        let mut sink = WriterSink::new(Vec::new());
        let mut framer = OutputFramer::begin(&mut sink, config).unwrap();
        for i in 0..blocks {
            framer
                .block(&EntropyBlock::from_words([i; EntropyBlock::WORDS]))
                .unwrap();
        }
        framer.finish(mask).unwrap();
        sink.into_inner().unwrap()
    }

    fn to_big_endian(bytes: &[u8]) -> Vec<u8> {
        bytes
            .chunks_exact(4)
            .flat_map(|w| [w[3], w[2], w[1], w[0]])
            .collect()
    }

    #[test]
    fn test_complete_frame() {
        let config = AcquisitionConfig::new(TrngMode::Sp80090b, 2, 500, 124).unwrap();
        let bytes = record(&config, 4, ErrorMask::CRNGT);

        let report = verify_bytes(&bytes).unwrap();
        assert_eq!(report.endianness, Endianness::Little);
        assert_eq!(report.header.mode, TrngMode::Sp80090b);
        assert_eq!(report.header.rosc_length, 2);
        assert_eq!(report.header.buffer_size, 124);
        assert_eq!(report.header.sample_count, 500);
        assert_eq!(report.blocks, 4);
        assert!(report.is_clean());
        assert!(report.check_clean(false).is_ok());
    }

    #[test]
    fn test_big_endian_recording() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 1, 9, 52).unwrap();
        let little = record(&config, 1, ErrorMask::SAMPLE_LOST);
        let report = verify_bytes(&to_big_endian(&little)).unwrap();

        assert_eq!(report.endianness, Endianness::Big);
        assert_eq!(report.header.sample_count, 9);
        assert!(report.sample_lost);
        assert!(!report.is_clean());
        assert!(matches!(report.check_clean(true), Err(FrameError::SamplesLost)));
    }

    #[test]
    fn test_aborted_frame_is_truncated() {
        let config = AcquisitionConfig::new(TrngMode::FullEvaluation, 0, 1, 124).unwrap();
        let bytes = record(&config, 0, ErrorMask::AUTOCORRELATION);

        let report = verify_bytes(&bytes).unwrap();
        assert_eq!(report.blocks, 0);
        assert!(report.is_truncated());
        assert!(!report.sample_lost);
        assert!(matches!(
            report.check_clean(false),
            Err(FrameError::Incomplete { blocks: 0, expected: 4 })
        ));
        assert!(report.check_clean(true).is_ok());
    }

    #[test]
    fn test_rejects_corruption() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 52).unwrap();
        let bytes = record(&config, 1, ErrorMask::empty());

        let mut bad = bytes.clone();
        bad[0] = 0;
        assert!(matches!(verify_bytes(&bad), Err(FrameError::BadMagic(_))));

        let mut bad = bytes.clone();
        bad[bytes.len() - 1] = 0;
        assert!(matches!(
            verify_bytes(&bad),
            Err(FrameError::Signature { what: "footer", .. })
        ));

        let mut bad = bytes.clone();
        bad.truncate(bytes.len() - 12);
        bad.extend_from_slice(&[0u8; 4]);
        bad.extend_from_slice(&bytes[bytes.len() - 12..]);
        assert!(matches!(verify_bytes(&bad), Err(FrameError::PartialBlock(28))));

        let extra = record(&config, 2, ErrorMask::empty());
        assert!(matches!(
            verify_bytes(&extra),
            Err(FrameError::TooManyBlocks { found: 2, expected: 1 })
        ));
    }
}
