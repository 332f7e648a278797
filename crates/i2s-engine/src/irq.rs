//! Interrupt fast path.
//!
//! [`Device::on_interrupt`] is called from the core's interrupt handler. It
//! never blocks and never moves data: it triages each flagged channel's
//! status, records what it saw in the channel flags and leaves the data
//! movement to the deferred worker.
//!
//! | Status bit     | Action (channel lock held)                                   |
//! |----------------|--------------------------------------------------------------|
//! | FIFO overflow  | port register ← 0, CCR ← 0, clear bit, `fifo_overflow`, `ready` |
//! | FIFO underflow | port register ← 0, CCR ← 0, clear bit, `fifo_underflow`       |
//! | Rx service     | hold Rx interrupt off, `ready`                               |
//! | Tx service     | hold Tx interrupt off, `ready`                               |
//!
//! Service-request bits are left set here; the worker clears them after the
//! buffer has been moved, otherwise the request would fire again at once.

use embedded_hal_async::delay::DelayNs;
use platform::{Direction, RegisterBus};

use crate::channel::{hold_off_bit, service_bit, ChannelIndex};
use crate::device::Device;
use crate::regs::{CCR, CSR, DSCR, FIFO_OVERFLOW, FIFO_UNDERFLOW};

impl<I, C, D> Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: DelayNs,
{
    /// Interrupt handler body.
    ///
    /// Returns `true` when the deferred worker was signalled, which happens
    /// whenever at least one channel is `ready` after triage.
    pub fn on_interrupt(&self) -> bool {
        let pending = self.i2s.read(DSCR);
        for idx in ChannelIndex::all() {
            if pending & idx.status_bit() != 0 {
                self.triage(idx);
            }
        }

        let schedule = ChannelIndex::all().any(|idx| self.with_channel(idx, |ch| ch.ready));
        if schedule {
            self.worker.signal(());
        }
        schedule
    }

    fn triage(&self, idx: ChannelIndex) {
        let csr = idx.reg(CSR);
        self.with_channel(idx, |ch| {
            let status = self.i2s.read(csr);

            if status & FIFO_OVERFLOW != 0 {
                error!("ch{}: FIFO overflow", idx.get());
                self.halt_channel_hw(idx);
                self.i2s.write(csr, FIFO_OVERFLOW);
                ch.fifo_overflow = true;
                ch.ready = true;
            }

            if status & FIFO_UNDERFLOW != 0 {
                error!("ch{}: FIFO underflow", idx.get());
                self.halt_channel_hw(idx);
                self.i2s.write(csr, FIFO_UNDERFLOW);
                ch.fifo_underflow = true;
            }

            for direction in [Direction::Rx, Direction::Tx] {
                if status & service_bit(direction) != 0 {
                    self.i2s.set_bits(idx.reg(CCR), hold_off_bit(direction));
                    ch.ready = true;
                }
            }
        });
    }

    /// Stop the owning port and the channel immediately.
    fn halt_channel_hw(&self, idx: ChannelIndex) {
        let port = idx.port();
        self.with_port(port, |_| self.i2s.write(port.register(), 0));
        self.i2s.write(idx.reg(CCR), 0);
    }
}
