//! Register bus abstraction for memory-mapped IP blocks.
//!
//! Drivers talk to hardware through [`RegisterBus`] rather than raw pointers,
//! so the same driver code runs against the real register window ([`Mmio`])
//! on hardware and against [`crate::mocks::MockRegisters`] in host tests.
//!
//! # Addressing
//!
//! All offsets are **word** offsets (one unit = one 32-bit register), matching
//! the way the FPGA IP data sheets number their registers. Byte address =
//! `base + offset * 4`.
//!
//! # Contexts
//!
//! Every method takes `&self`: a register window is shared by thread-mode code,
//! the interrupt handler and the deferred worker. Implementations must
//! therefore be `Sync` when the owning driver is placed in a `static`.

/// 32-bit register window.
pub trait RegisterBus {
    /// Read the register at `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`.
    fn write(&self, offset: usize, value: u32);

    /// Read-modify-write. Not atomic with respect to other contexts: callers
    /// hold whatever lock guards the register.
    fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.read(offset);
        self.write(offset, f(value));
    }

    /// OR `bits` into the register.
    fn set_bits(&self, offset: usize, bits: u32) {
        self.modify(offset, |v| v | bits);
    }

    /// Clear `bits` in the register.
    fn clear_bits(&self, offset: usize, bits: u32) {
        self.modify(offset, |v| v & !bits);
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }
}

/// Volatile accessor over a mapped register window.
///
/// Offsets outside the window are ignored on write and read back as `0`,
/// so a bad offset can never scribble over a neighbouring IP block.
#[derive(Debug)]
pub struct Mmio {
    base: *mut u32,
    words: usize,
}

// SAFETY: `Mmio` only performs single volatile 32-bit loads/stores. The IP
// blocks it addresses tolerate concurrent accesses from any context; ordering
// between multi-register sequences is the caller's responsibility (see the
// channel/port locks in the engine).
unsafe impl Send for Mmio {}
// SAFETY: see `Send` above; no Rust-visible memory is aliased through `base`.
unsafe impl Sync for Mmio {}

impl Mmio {
    /// Wrap a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point to a device register window of at least `words`
    /// 32-bit registers that stays mapped for the lifetime of the returned
    /// value, and must not be used as ordinary memory by anyone else.
    pub const unsafe fn new(base: *mut u32, words: usize) -> Self {
        Self { base, words }
    }

    /// Number of 32-bit registers in the window.
    pub fn len_words(&self) -> usize {
        self.words
    }
}

impl RegisterBus for Mmio {
    fn read(&self, offset: usize) -> u32 {
        if offset >= self.words {
            return 0;
        }
        // SAFETY: offset < words, and `new` guarantees the window is mapped.
        unsafe { self.base.add(offset).read_volatile() }
    }

    fn write(&self, offset: usize, value: u32) {
        if offset >= self.words {
            return;
        }
        // SAFETY: offset < words, and `new` guarantees the window is mapped.
        unsafe { self.base.add(offset).write_volatile(value) }
    }
}
