//! Output framing.
//!
//! A collection is streamed as a fixed header, a run of entropy blocks and
//! a fixed footer. Signatures repeat at both ends of the header and footer
//! so a consumer can find frame boundaries without length metadata.

pub mod format;
mod framer;
mod verify;

pub use framer::{OutputFramer, Sink, WriterSink};
pub use verify::{verify_bytes, verify_frame, Endianness, FrameError, FrameHeader, FrameReport};
