//! Deferred transfer worker.
//!
//! Moves data between buffer memory and the channel FIFO windows for every
//! channel the interrupt path marked `ready`. Runs in task context, one
//! service pass per notification; passes never overlap.
//!
//! For one channel:
//!
//! 1. *(lock)* pop the head buffer, mark the channel busy
//! 2. copy `buffer_length / 4` words, Rx: FIFO → memory, Tx: memory → FIFO
//! 3. *(lock)* clear busy and `ready`, clear the service-request bit,
//!    re-arm the direction's interrupt
//! 4. complete the buffer with [`MboStatus::Success`]
//!
//! Step 2 runs without the lock so a full buffer copy never extends the
//! interrupt-masked window. If the channel is poisoned during the copy, the
//! generation changes and step 3 leaves the registers alone.

use core::sync::atomic::Ordering;

use embedded_hal_async::delay::DelayNs;
use platform::{Direction, Mbo, MboStatus, RegisterBus};

use crate::channel::{rearm_mask, service_bit, ChannelIndex};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::regs::{CBBAR, CCR, CSR, NBBAR};

/// Outcome of one service pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceReport {
    /// Channels whose head buffer was transferred.
    pub serviced: u8,
    /// Ready channels left ready because nothing was queued.
    pub starved: u8,
}

/// Move one buffer's words through the channel FIFO window.
fn copy_words<B: RegisterBus>(bus: &B, idx: ChannelIndex, direction: Direction, mbo: &mut Mbo) {
    let len = mbo.buffer_length;
    let Some(memory) = mbo.memory.as_deref_mut().and_then(|m| m.get_mut(..len)) else {
        return;
    };
    match direction {
        Direction::Rx => {
            let window = idx.reg(CBBAR);
            for quad in memory.chunks_exact_mut(4) {
                quad.copy_from_slice(&bus.read(window).to_ne_bytes());
            }
        }
        Direction::Tx => {
            let window = idx.reg(NBBAR);
            for quad in memory.chunks_exact(4) {
                if let Ok(word) = <[u8; 4]>::try_from(quad) {
                    bus.write(window, u32::from_ne_bytes(word));
                }
            }
        }
    }
}

impl<I, C, D> Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: DelayNs,
{
    /// Transfer the head buffer of channel `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::Range`] for an invalid index
    /// - [`Error::Again`] when the queue is empty (`ready` stays set) or the
    ///   channel is already being serviced
    pub fn transfer(&self, index: usize) -> Result<()> {
        self.transfer_channel(ChannelIndex::new(index)?)
    }

    pub(crate) fn transfer_channel(&self, idx: ChannelIndex) -> Result<()> {
        let (mut mbo, direction, generation) = self.with_channel(idx, |ch| {
            if ch.busy {
                return Err(Error::Again);
            }
            let Some(mbo) = ch.queue.pop_front() else {
                debug!("ch{}: no buffer", idx.get());
                return Err(Error::Again);
            };
            ch.busy = true;
            Ok((mbo, ch.direction, ch.generation))
        })?;

        copy_words(&self.i2s, idx, direction, &mut mbo);

        self.with_channel(idx, |ch| {
            ch.busy = false;
            if ch.generation != generation {
                return;
            }
            ch.ready = false;
            self.i2s.write(idx.reg(CSR), service_bit(direction));
            self.i2s.modify(idx.reg(CCR), |v| v & rearm_mask(direction));
        });

        let length = mbo.buffer_length;
        mbo.finish(MboStatus::Success, length);
        Ok(())
    }

    /// One service pass over every `ready` channel.
    ///
    /// If another pass is already running, this one does nothing and
    /// re-signals the worker so the request is not lost.
    pub fn service_ready_channels(&self) -> ServiceReport {
        if self.worker_active.swap(true, Ordering::Acquire) {
            self.worker.signal(());
            return ServiceReport::default();
        }

        let mut report = ServiceReport::default();
        for idx in ChannelIndex::all() {
            if !self.with_channel(idx, |ch| ch.ready) {
                continue;
            }
            match self.transfer_channel(idx) {
                Ok(()) => report.serviced = report.serviced.saturating_add(1),
                Err(_) => report.starved = report.starved.saturating_add(1),
            }
        }

        self.worker_active.store(false, Ordering::Release);
        trace!("worker: serviced {} starved {}", report.serviced, report.starved);
        report
    }

    /// Deferred worker task: one service pass per interrupt notification.
    /// Never returns.
    ///
    /// Spawn once per device, e.g. from an Embassy task holding
    /// `&'static Device`.
    pub async fn run_deferred_worker(&self) {
        loop {
            self.worker.wait().await;
            let _ = self.service_ready_channels();
        }
    }
}
