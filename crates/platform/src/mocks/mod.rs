//! Mock implementations for testing
//!
//! This module provides mock implementations of the platform traits
//! for use in unit and integration tests:
//!
//! - [`MockRegisters`]: a scriptable [`RegisterBus`] that logs every write
//! - [`MockDelay`]: an [`embedded_hal_async::delay::DelayNs`] that only counts
//! - [`RecordingCompletion`]: an [`MboCompletion`] that keeps returned buffers

#![cfg(any(test, feature = "std"))]

use std::boxed::Box;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec;
use std::vec::Vec;

use crate::registers::RegisterBus;
use crate::stream::{Mbo, MboCompletion, MboStatus};

#[derive(Default)]
struct RegisterFile {
    values: BTreeMap<usize, u32>,
    scripted: BTreeMap<usize, VecDeque<u32>>,
    forced: BTreeMap<usize, u32>,
    write_one_to_clear: BTreeSet<usize>,
    writes: Vec<(usize, u32)>,
    reads: Vec<usize>,
}

/// Mock register window.
///
/// Reads return, in priority order: the next scripted value for the offset,
/// otherwise the stored value. Bits registered with
/// [`force_bits`](Self::force_bits) are ORed into every read, which models
/// read-only status bits driven by hardware. Offsets marked
/// [`write_one_to_clear`](Self::write_one_to_clear) clear the written bits
/// instead of storing the value.
#[derive(Default)]
pub struct MockRegisters {
    file: Mutex<RegisterFile>,
}

impl MockRegisters {
    /// Create an all-zero register window.
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&self) -> MutexGuard<'_, RegisterFile> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Preload a register without logging a write.
    pub fn set(&self, offset: usize, value: u32) {
        self.file().values.insert(offset, value);
    }

    /// Stored value (no scripts, no forced bits, no read logged).
    pub fn get(&self, offset: usize) -> u32 {
        self.file().values.get(&offset).copied().unwrap_or(0)
    }

    /// Queue values returned by the next reads of `offset`.
    pub fn script_reads(&self, offset: usize, values: &[u32]) {
        self.file()
            .scripted
            .entry(offset)
            .or_default()
            .extend(values.iter().copied());
    }

    /// OR `bits` into every subsequent read of `offset`.
    pub fn force_bits(&self, offset: usize, bits: u32) {
        *self.file().forced.entry(offset).or_insert(0) |= bits;
    }

    /// Stop forcing bits on `offset`.
    pub fn release_bits(&self, offset: usize) {
        self.file().forced.remove(&offset);
    }

    /// Give `offset` write-one-to-clear semantics.
    pub fn write_one_to_clear(&self, offset: usize) {
        self.file().write_one_to_clear.insert(offset);
    }

    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.file().writes.clone()
    }

    /// Values written to `offset`, in order.
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.file()
            .writes
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Number of reads of `offset` so far.
    pub fn read_count(&self, offset: usize) -> usize {
        self.file().reads.iter().filter(|o| **o == offset).count()
    }

    /// Forget the write and read logs (register contents are kept).
    pub fn clear_log(&self) {
        let mut file = self.file();
        file.writes.clear();
        file.reads.clear();
    }
}

impl RegisterBus for MockRegisters {
    fn read(&self, offset: usize) -> u32 {
        let mut file = self.file();
        file.reads.push(offset);
        let base = match file.scripted.get_mut(&offset).and_then(VecDeque::pop_front) {
            Some(value) => value,
            None => file.values.get(&offset).copied().unwrap_or(0),
        };
        base | file.forced.get(&offset).copied().unwrap_or(0)
    }

    fn write(&self, offset: usize, value: u32) {
        let mut file = self.file();
        file.writes.push((offset, value));
        if file.write_one_to_clear.contains(&offset) {
            let current = file.values.get(&offset).copied().unwrap_or(0);
            file.values.insert(offset, current & !value);
        } else {
            file.values.insert(offset, value);
        }
    }
}

/// Delay that returns immediately and accumulates the requested time.
///
/// Clones share their counters, so a test can keep one clone while the
/// driver owns the other.
#[derive(Clone, Default)]
pub struct MockDelay {
    elapsed_ns: Arc<AtomicU64>,
    calls: Arc<AtomicUsize>,
}

impl MockDelay {
    /// Create a delay with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in nanoseconds.
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns.load(Ordering::Relaxed)
    }

    /// Total requested delay in microseconds (rounded down).
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns() / 1_000
    }

    /// Number of delay calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(u64::from(ns), Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    async fn delay_us(&mut self, us: u32) {
        self.elapsed_ns
            .fetch_add(u64::from(us) * 1_000, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns
            .fetch_add(u64::from(ms) * 1_000_000, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// Completion sink that keeps every returned buffer, in completion order.
#[derive(Default)]
pub struct RecordingCompletion {
    done: Mutex<Vec<Mbo>>,
}

impl RecordingCompletion {
    /// Allocate a sink with `'static` lifetime, as [`Mbo`] requires.
    pub fn leak() -> &'static Self {
        Box::leak(Box::default())
    }

    fn done(&self) -> MutexGuard<'_, Vec<Mbo>> {
        self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of buffers returned so far.
    pub fn count(&self) -> usize {
        self.done().len()
    }

    /// `(context, status, processed_length)` of every returned buffer.
    pub fn outcomes(&self) -> Vec<(usize, MboStatus, usize)> {
        self.done()
            .iter()
            .map(|m| (m.context, m.status, m.processed_length))
            .collect()
    }

    /// Take ownership of every returned buffer.
    pub fn take(&self) -> Vec<Mbo> {
        core::mem::take(&mut *self.done())
    }
}

impl MboCompletion for RecordingCompletion {
    fn complete(&self, mbo: Mbo) {
        self.done().push(mbo);
    }
}

/// Allocate zeroed buffer memory with `'static` lifetime.
pub fn leak_buffer(len: usize) -> &'static mut [u8] {
    Box::leak(vec![0u8; len].into_boxed_slice())
}

/// Allocate buffer memory holding `words` in native byte order.
pub fn leak_words(words: &[u32]) -> &'static mut [u8] {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
    Box::leak(bytes.into_boxed_slice())
}

/// Interpret buffer memory as native-endian words.
pub fn words_of(memory: &[u8]) -> Vec<u32> {
    memory
        .chunks_exact(4)
        .map(|c| {
            let mut word = [0u8; 4];
            word.copy_from_slice(c);
            u32::from_ne_bytes(word)
        })
        .collect()
}
