//! Streaming output of a collection through a caller-supplied sink.

use super::format::{self, FOOTER_BYTES, HEADER_BYTES};
use crate::acquisition::{EntropyBlock, ErrorMask};
use crate::config::AcquisitionConfig;
use std::io::{self, Write};

/// Receives framed output, one chunk per call.
///
/// Chunks arrive in order: the header, one chunk per body block, then the
/// footer. The slice is only valid for the duration of the call.
pub trait Sink {
    /// Accepts the next chunk of the frame.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<F> Sink for F
where
    F: FnMut(&[u8]),
{
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self(chunk);
        Ok(())
    }
}

/// Sink forwarding every chunk to an [`io::Write`].
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> WriterSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// Total bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer.write_all(chunk)?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }
}

/// Emits one frame: header, body blocks, footer.
///
/// Nothing is buffered beyond the chunk being written.
pub struct OutputFramer<'s, S: Sink + ?Sized> {
    sink: &'s mut S,
    blocks: u32,
}

impl<'s, S: Sink + ?Sized> OutputFramer<'s, S> {
    /// Writes the header and returns a framer ready for body blocks.
    pub fn begin(sink: &'s mut S, config: &AcquisitionConfig) -> io::Result<Self> {
        let header: [u8; HEADER_BYTES] = format::to_le_bytes(&format::header_words(config));
        sink.write_chunk(&header)?;
        Ok(Self { sink, blocks: 0 })
    }

    /// Writes one body block.
    pub fn block(&mut self, block: &EntropyBlock) -> io::Result<()> {
        self.sink.write_chunk(&block.to_le_bytes())?;
        self.blocks += 1;
        Ok(())
    }

    /// Writes the footer and closes the frame.
    pub fn finish(self, mask: ErrorMask) -> io::Result<u32> {
        let footer: [u8; FOOTER_BYTES] = format::to_le_bytes(&format::footer_words(mask));
        self.sink.write_chunk(&footer)?;
        Ok(self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrngMode;

    #[test]
    fn test_frame_chunks_in_order() {
        let config = AcquisitionConfig::new(TrngMode::FullEvaluation, 1, 7, 100).unwrap();
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut sink = |chunk: &[u8]| chunks.push(chunk.to_vec());

        let mut framer = OutputFramer::begin(&mut sink, &config).unwrap();
        framer.block(&EntropyBlock::from_words([1, 2, 3, 4, 5, 6])).unwrap();
        let blocks = framer.finish(ErrorMask::SAMPLE_LOST | ErrorMask::CRNGT).unwrap();

        assert_eq!(blocks, 1);
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[0],
            [
                0xDD, 0xCC, 0xBB, 0xAA, 100, 0, 0, 0x41, 7, 0, 0, 0, 0xDD, 0xCC, 0xBB, 0xAA
            ]
        );
        assert_eq!(chunks[1].len(), 24);
        assert_eq!(
            chunks[2],
            [0xAA, 0xBB, 0xCC, 0xDD, 1, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD]
        );
    }

    #[test]
    fn test_writer_sink_counts_bytes() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 52).unwrap();
        let mut sink = WriterSink::new(Vec::new());

        let framer = OutputFramer::begin(&mut sink, &config).unwrap();
        framer.finish(ErrorMask::empty()).unwrap();

        assert_eq!(sink.bytes_written(), 28);
        assert_eq!(sink.into_inner().unwrap().len(), 28);
    }

    struct Broken;

    impl Sink for Broken {
        fn write_chunk(&mut self, _chunk: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_sink_error_propagates() {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, 52).unwrap();
        assert!(OutputFramer::begin(&mut Broken, &config).is_err());
    }
}
