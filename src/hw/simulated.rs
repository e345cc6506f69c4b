//! Simulated TRNG register file for tests and demonstrations.
//!
//! The simulator models the behavior the acquisition logic depends on:
//! reset semantics, the sample counter latch, per-block status reporting,
//! the latched autocorrelation fault and the refill-after-six-reads rule.
//! Block contents come from a seeded ChaCha20 stream, which is NOT a source
//! of entropy; it only makes runs reproducible.

use super::registers::{self, RegisterBlock, EHR_WORDS};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::collections::VecDeque;

/// What the simulated hardware does for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEvent {
    /// Block becomes ready after `delay_polls` status reads, reporting the
    /// extra status `flags` (CRNGT, Von Neumann) alongside the ready bit.
    Ready {
        /// Status polls reporting nothing first.
        delay_polls: u32,
        /// Extra status bits.
        flags: u32,
    },
    /// Block was already sitting in the EHR when the host looked: the host
    /// fell behind and the previous sample was overwritten.
    Overrun,
    /// Autocorrelation test fails. Latched until the next reset.
    Autocorrelation,
    /// Hardware never reports the block.
    Stall,
}

impl BlockEvent {
    /// Ready on the first poll, no errors.
    pub const CLEAN: Self = Self::Ready {
        delay_polls: 0,
        flags: 0,
    };
}

#[derive(Debug, Clone, Copy)]
struct PendingBlock {
    event: BlockEvent,
    polls: u32,
    acknowledged: bool,
}

/// In-memory TRNG block implementing [`RegisterBlock`].
#[derive(Debug)]
pub struct SimulatedTrng {
    seed: u64,
    rng: ChaCha20Rng,
    script: VecDeque<BlockEvent>,
    default_event: BlockEvent,
    pending: Option<PendingBlock>,
    ehr: [u32; EHR_WORDS],
    ehr_reads: usize,
    clock_enabled: bool,
    source_enabled: bool,
    sample_count: u32,
    latch_delay: u32,
    ignored_count_writes: u32,
    rosc_length: u32,
    debug_control: u32,
    autocorrelation_latched: bool,
    resets: u32,
    blocks_delivered: u32,
    acknowledgements: u32,
    writes: Vec<(usize, u32)>,
}

impl SimulatedTrng {
    /// Creates a simulator whose block contents derive from `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let ehr = Self::draw(&mut rng);
        Self {
            seed,
            rng,
            script: VecDeque::new(),
            default_event: BlockEvent::CLEAN,
            pending: None,
            ehr,
            ehr_reads: 0,
            clock_enabled: false,
            source_enabled: false,
            sample_count: 0,
            latch_delay: 0,
            ignored_count_writes: 0,
            rosc_length: 0,
            debug_control: 0,
            autocorrelation_latched: false,
            resets: 0,
            blocks_delivered: 0,
            acknowledgements: 0,
            writes: Vec::new(),
        }
    }

    /// Ignores the first `writes` sample counter writes after each reset.
    pub fn with_sample_count_latch_delay(mut self, writes: u32) -> Self {
        self.latch_delay = writes;
        self
    }

    /// Sets what happens to blocks with no scripted event.
    pub fn with_default_event(mut self, event: BlockEvent) -> Self {
        self.default_event = event;
        self
    }

    /// Appends scripted events, consumed one per block.
    pub fn with_script(mut self, events: impl IntoIterator<Item = BlockEvent>) -> Self {
        self.script.extend(events);
        self
    }

    /// Scripts `event` for the block at `index`, counting from the next
    /// unconsumed block. Earlier unscripted blocks get the default event.
    pub fn with_event_at(mut self, index: usize, event: BlockEvent) -> Self {
        while self.script.len() <= index {
            self.script.push_back(self.default_event);
        }
        self.script[index] = event;
        self
    }

    /// Restores the power-on state, including the data stream and write log.
    /// Scripted events are kept.
    pub fn power_on_reset(&mut self) {
        self.rng = ChaCha20Rng::seed_from_u64(self.seed);
        self.ehr = Self::draw(&mut self.rng);
        self.writes.clear();
        self.resets = 0;
        self.blocks_delivered = 0;
        self.acknowledgements = 0;
        self.soft_reset();
    }

    /// Every register write so far, in order.
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    /// True while the oscillators run.
    pub fn is_source_enabled(&self) -> bool {
        self.source_enabled
    }

    /// True once the clock was enabled since reset.
    pub fn is_clock_enabled(&self) -> bool {
        self.clock_enabled
    }

    /// Latched sample counter value.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Programmed oscillator length.
    pub fn rosc_length(&self) -> u32 {
        self.rosc_length
    }

    /// Programmed bypass mask.
    pub fn debug_control(&self) -> u32 {
        self.debug_control
    }

    /// True after an autocorrelation failure, until reset.
    pub fn is_autocorrelation_latched(&self) -> bool {
        self.autocorrelation_latched
    }

    /// Software resets seen since power-on.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Blocks fully read out by the host.
    pub fn blocks_delivered(&self) -> u32 {
        self.blocks_delivered
    }

    /// Interrupt acknowledgements seen.
    pub fn acknowledgements(&self) -> u32 {
        self.acknowledgements
    }

    fn draw(rng: &mut ChaCha20Rng) -> [u32; EHR_WORDS] {
        let mut words = [0u32; EHR_WORDS];
        for word in &mut words {
            *word = rng.next_u32();
        }
        words
    }

    fn soft_reset(&mut self) {
        self.clock_enabled = false;
        self.source_enabled = false;
        self.sample_count = 0;
        self.ignored_count_writes = 0;
        self.rosc_length = 0;
        self.debug_control = 0;
        self.autocorrelation_latched = false;
        self.pending = None;
        self.ehr_reads = 0;
    }

    /// Returns the block currently being produced, starting the next one if needed.
    fn pending_block(&mut self) -> &mut PendingBlock {
        let script = &mut self.script;
        let default_event = self.default_event;
        self.pending.get_or_insert_with(|| PendingBlock {
            event: script.pop_front().unwrap_or(default_event),
            polls: 0,
            acknowledged: false,
        })
    }

    fn read_valid(&mut self) -> u32 {
        if !self.source_enabled {
            return registers::EHR_NOT_READY;
        }
        match self.pending_block().event {
            BlockEvent::Overrun => 1,
            _ => registers::EHR_NOT_READY,
        }
    }

    fn read_status(&mut self) -> u32 {
        if self.autocorrelation_latched {
            return registers::ISR_AUTOCORR_ERR;
        }
        if !self.source_enabled {
            return 0;
        }

        let block = self.pending_block();
        if block.acknowledged {
            return 0;
        }
        match block.event {
            BlockEvent::Ready { delay_polls, flags } => {
                if block.polls < delay_polls {
                    block.polls += 1;
                    0
                } else {
                    registers::ISR_EHR_VALID | flags
                }
            }
            BlockEvent::Overrun => registers::ISR_EHR_VALID,
            BlockEvent::Autocorrelation => {
                self.autocorrelation_latched = true;
                registers::ISR_AUTOCORR_ERR
            }
            BlockEvent::Stall => 0,
        }
    }

    fn read_ehr(&mut self, index: usize) -> u32 {
        let word = self.ehr[index];
        self.ehr_reads += 1;
        if self.ehr_reads == EHR_WORDS {
            self.ehr = Self::draw(&mut self.rng);
            self.ehr_reads = 0;
            self.pending = None;
            self.blocks_delivered += 1;
        }
        word
    }

    fn write_sample_count(&mut self, value: u32) {
        if !self.clock_enabled {
            return;
        }
        if self.ignored_count_writes < self.latch_delay {
            self.ignored_count_writes += 1;
            return;
        }
        self.sample_count = value;
    }
}

impl RegisterBlock for SimulatedTrng {
    fn read_word(&mut self, offset: usize) -> u32 {
        match offset {
            registers::ISR => self.read_status(),
            registers::VALID => self.read_valid(),
            registers::CONFIG => self.rosc_length,
            registers::SOURCE_ENABLE => self.source_enabled as u32,
            registers::SAMPLE_CNT1 => self.sample_count,
            registers::DEBUG_CONTROL => self.debug_control,
            registers::CLK_ENABLE => self.clock_enabled as u32,
            o if (registers::ehr_data(0)..registers::ehr_data(EHR_WORDS)).contains(&o) => {
                self.read_ehr((o - registers::EHR_DATA_0) / 4)
            }
            _ => 0,
        }
    }

    fn write_word(&mut self, offset: usize, value: u32) {
        self.writes.push((offset, value));
        match offset {
            registers::ICR => {
                self.acknowledgements += 1;
                if let Some(block) = self.pending.as_mut() {
                    block.acknowledged = true;
                }
            }
            registers::CONFIG => self.rosc_length = value & 0b11,
            registers::SOURCE_ENABLE => self.source_enabled = value & 1 != 0,
            registers::SAMPLE_CNT1 => self.write_sample_count(value),
            registers::DEBUG_CONTROL => self.debug_control = value,
            registers::SW_RESET if value & 1 != 0 => {
                self.resets += 1;
                self.soft_reset();
            }
            registers::CLK_ENABLE => self.clock_enabled = value & 1 != 0,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(sim: SimulatedTrng) -> SimulatedTrng {
        let mut sim = sim;
        sim.write_word(registers::SW_RESET, 1);
        sim.write_word(registers::CLK_ENABLE, 1);
        sim.write_word(registers::SOURCE_ENABLE, 1);
        sim
    }

    fn drain(sim: &mut SimulatedTrng) -> [u32; EHR_WORDS] {
        let mut words = [0; EHR_WORDS];
        for (i, w) in words.iter_mut().enumerate() {
            *w = sim.read_word(registers::ehr_data(i));
        }
        words
    }

    #[test]
    fn test_sample_count_needs_clock() {
        let mut sim = SimulatedTrng::new(0);
        sim.write_word(registers::SAMPLE_CNT1, 42);
        assert_eq!(sim.read_word(registers::SAMPLE_CNT1), 0);

        sim.write_word(registers::CLK_ENABLE, 1);
        sim.write_word(registers::SAMPLE_CNT1, 42);
        assert_eq!(sim.read_word(registers::SAMPLE_CNT1), 42);

        sim.write_word(registers::SW_RESET, 1);
        assert_eq!(sim.read_word(registers::SAMPLE_CNT1), 0);
        assert!(!sim.is_clock_enabled());
    }

    #[test]
    fn test_refill_after_six_reads() {
        let mut sim = enabled(SimulatedTrng::new(7));
        assert_eq!(sim.read_word(registers::ISR), registers::ISR_EHR_VALID);

        let first = drain(&mut sim);
        assert_eq!(sim.blocks_delivered(), 1);
        let second = drain(&mut sim);
        assert_ne!(first, second);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = enabled(SimulatedTrng::new(3));
        let mut b = enabled(SimulatedTrng::new(3));
        assert_eq!(drain(&mut a), drain(&mut b));

        a.power_on_reset();
        let mut fresh = SimulatedTrng::new(3);
        assert_eq!(drain(&mut a), drain(&mut fresh));
        assert!(a.writes().is_empty());
    }

    #[test]
    fn test_ready_delay() {
        let mut sim = enabled(SimulatedTrng::new(0).with_script([BlockEvent::Ready {
            delay_polls: 2,
            flags: registers::ISR_CRNGT_ERR,
        }]));
        assert_eq!(sim.read_word(registers::ISR), 0);
        assert_eq!(sim.read_word(registers::ISR), 0);
        assert_eq!(
            sim.read_word(registers::ISR),
            registers::ISR_EHR_VALID | registers::ISR_CRNGT_ERR
        );

        sim.write_word(registers::ICR, !0);
        assert_eq!(sim.read_word(registers::ISR), 0);
        assert_eq!(sim.acknowledgements(), 1);
    }

    #[test]
    fn test_autocorrelation_latches_until_reset() {
        let mut sim = enabled(SimulatedTrng::new(0).with_event_at(1, BlockEvent::Autocorrelation));

        assert_eq!(sim.read_word(registers::ISR), registers::ISR_EHR_VALID);
        drain(&mut sim);
        assert_eq!(sim.read_word(registers::ISR), registers::ISR_AUTOCORR_ERR);
        assert!(sim.is_autocorrelation_latched());
        assert_eq!(sim.read_word(registers::ISR), registers::ISR_AUTOCORR_ERR);

        sim.write_word(registers::SW_RESET, 1);
        assert!(!sim.is_autocorrelation_latched());
    }

    #[test]
    fn test_overrun_reports_ready_at_entry() {
        let mut sim = enabled(SimulatedTrng::new(0).with_script([BlockEvent::Overrun]));
        assert_eq!(sim.read_word(registers::VALID), 1);
        drain(&mut sim);
        assert_eq!(sim.read_word(registers::VALID), registers::EHR_NOT_READY);
    }

    #[test]
    fn test_disabled_source_never_ready() {
        let mut sim = SimulatedTrng::new(0);
        assert_eq!(sim.read_word(registers::VALID), 0);
        assert_eq!(sim.read_word(registers::ISR), 0);
    }
}
