//! Volatile memory-mapped access to a real TRNG block.

use super::RegisterBlock;
use std::ptr::NonNull;

/// Register block backed by volatile loads and stores at a mapped base address.
///
/// Mapping the physical block into the address space is the caller's job;
/// this type only performs the accesses.
#[derive(Debug)]
pub struct MmioRegisters {
    base: NonNull<u32>,
}

impl MmioRegisters {
    /// Wraps a mapped register window.
    ///
    /// Returns `None` for a null or misaligned base.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapped TRNG register window at least
    /// `0x1C8` bytes long that stays valid for the lifetime of the returned
    /// value, and no other code may access the window concurrently.
    pub unsafe fn new(base: usize) -> Option<Self> {
        if base % core::mem::align_of::<u32>() != 0 {
            return None;
        }
        NonNull::new(base as *mut u32).map(|base| Self { base })
    }

    #[inline]
    fn word_ptr(&self, offset: usize) -> *mut u32 {
        debug_assert_eq!(offset % 4, 0, "register offset {offset:#x} is not word aligned");
        // SAFETY: `new` requires the window to cover every register offset.
        unsafe { self.base.as_ptr().add(offset / core::mem::size_of::<u32>()) }
    }
}

impl RegisterBlock for MmioRegisters {
    #[inline]
    fn read_word(&mut self, offset: usize) -> u32 {
        // SAFETY: the pointer lies inside the window promised to `new`.
        unsafe { core::ptr::read_volatile(self.word_ptr(offset)) }
    }

    #[inline]
    fn write_word(&mut self, offset: usize, value: u32) {
        // SAFETY: the pointer lies inside the window promised to `new`.
        unsafe { core::ptr::write_volatile(self.word_ptr(offset), value) }
    }
}
