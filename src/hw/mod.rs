//! TRNG hardware access.
//!
//! The register block is treated as an opaque capability so the acquisition
//! logic runs unchanged against real memory-mapped hardware or against the
//! simulated register file.

#[allow(unsafe_code)]
mod mmio;
mod poll;
pub mod registers;
pub mod sequencer;
mod simulated;

pub use mmio::MmioRegisters;
pub use poll::{PollStrategy, PollTimeout};
pub use registers::RegisterBlock;
pub use sequencer::SampleCountNotLatched;
pub use simulated::{BlockEvent, SimulatedTrng};
