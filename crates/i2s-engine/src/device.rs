//! Device: one attached instance of the I2S streaming core.
//!
//! A [`Device`] owns the register windows of the core and its clock
//! generator, the eight channels, the two ports and the deferred-worker
//! notification. It is meant to live in a `static` (or a `StaticCell`) so
//! the interrupt handler, the worker task and producers can all reach it
//! through `&Device`.
//!
//! # Locking
//!
//! | State                         | Guard                                  |
//! |-------------------------------|----------------------------------------|
//! | channel state, queue, flags   | per-channel blocking mutex             |
//! | port settings, DCCRA / DCCRB  | per-port blocking mutex                |
//! | clock source                  | blocking mutex                         |
//! | clock generator sequence      | async mutex inside [`ClockGenerator`]  |
//! | bus enable / disable          | async mutex                            |
//!
//! Blocking mutexes use [`CriticalSectionRawMutex`]: they mask interrupts
//! on the local core and are held only for state transitions and short
//! register read-modify-writes. Lock order is channel → port. Completion
//! callbacks are always invoked with no lock held.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use platform::{
    ChannelCapability, ChannelConfig, DataType, DirectionMask, Mbo, MboStatus, RegisterBus,
    Rejected, StreamInterface,
};

use crate::channel::{Channel, ChannelIndex, ChannelState};
use crate::clkgen::{ClockGenerator, ClockSource};
use crate::error::Error;
use crate::port::{self, PortConfig, PortId};
use crate::queue::MAX_BUFFERS;

/// Number of channels.
pub const NUM_CHANNELS: usize = 8;

/// Channels served by one port.
pub const CHANNELS_PER_PORT: usize = 4;

/// Number of ports.
pub const NUM_PORTS: usize = 2;

/// Hardware FIFO size in bytes.
pub const FIFO_WIDTH: usize = 4096;

/// Fixed streaming buffer size in bytes (496 quadlets).
pub const BUFFER_SIZE: usize = 1984;

/// Buffers a Tx channel needs queued before it is enabled, enough to fill
/// the FIFO so the first service request does not underflow.
pub const PREFILL_THRESHOLD: usize = FIFO_WIDTH / BUFFER_SIZE;

type ChannelCell = BlockingMutex<CriticalSectionRawMutex, RefCell<Channel>>;
type PortCell = BlockingMutex<CriticalSectionRawMutex, RefCell<PortConfig>>;

/// One attached I2S streaming core.
///
/// - `I`: register window of the I2S core
/// - `C`: register window of the clock generator
/// - `D`: delay provider for clock generator settle times
pub struct Device<I, C, D> {
    pub(crate) i2s: I,
    pub(crate) clkgen: ClockGenerator<C, D>,
    irq: u32,
    channels: [ChannelCell; NUM_CHANNELS],
    ports: [PortCell; NUM_PORTS],
    clock_source: BlockingMutex<CriticalSectionRawMutex, Cell<ClockSource>>,
    pub(crate) bus_enabled: AtomicBool,
    pub(crate) bus_lock: AsyncMutex<CriticalSectionRawMutex, ()>,
    pub(crate) worker: Signal<CriticalSectionRawMutex, ()>,
    pub(crate) worker_active: AtomicBool,
    capabilities: [ChannelCapability; NUM_CHANNELS],
}

impl<I, C, D> Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: DelayNs,
{
    /// Attach to the hardware.
    ///
    /// Every channel starts uninitialized, both ports start undefined and
    /// disabled, the bus is disabled and the clock source is
    /// [`ClockSource::Phy1Rmck0`]. No register is touched.
    pub fn new(i2s: I, clkgen: C, delay: D, irq: u32) -> Self {
        let capability = ChannelCapability {
            direction: DirectionMask::BOTH,
            data_type: DataType::Sync,
            num_buffers_streaming: u16::try_from(MAX_BUFFERS).unwrap_or(u16::MAX),
            buffer_size_streaming: BUFFER_SIZE,
        };
        info!(
            "{} {}: attach, irq {}",
            platform::config::DRIVER_NAME,
            platform::config::DRIVER_VERSION,
            irq
        );
        Self {
            i2s,
            clkgen: ClockGenerator::new(clkgen, delay),
            irq,
            channels: core::array::from_fn(|_| BlockingMutex::new(RefCell::new(Channel::new()))),
            ports: core::array::from_fn(|_| BlockingMutex::new(RefCell::new(PortConfig::default()))),
            clock_source: BlockingMutex::new(Cell::new(ClockSource::default())),
            bus_enabled: AtomicBool::new(false),
            bus_lock: AsyncMutex::new(()),
            worker: Signal::new(),
            worker_active: AtomicBool::new(false),
            capabilities: [capability; NUM_CHANNELS],
        }
    }

    /// Interrupt line the core was attached with.
    pub fn irq(&self) -> u32 {
        self.irq
    }

    /// Capability vector, one entry per channel.
    pub fn capabilities(&self) -> &[ChannelCapability] {
        &self.capabilities
    }

    /// Detach from the hardware.
    ///
    /// Shuts the ports down if the bus is enabled, stops every active
    /// channel, returns every pending buffer with [`MboStatus::Closed`] and
    /// gives back the register windows and the delay provider.
    pub fn detach(self) -> (I, C, D) {
        if self.bus_enabled.load(Ordering::Acquire) {
            for id in PortId::ALL {
                self.with_port(id, |cfg| {
                    if cfg.enabled {
                        port::shutdown(&self.i2s, id);
                    }
                });
            }
        }

        let mut returned: usize = 0;
        for idx in ChannelIndex::all() {
            let drained = self.with_channel(idx, |ch| {
                if ch.state != ChannelState::Uninitialized {
                    self.disable_channel_hw(idx);
                    ch.state = ChannelState::Uninitialized;
                    ch.generation = ch.generation.wrapping_add(1);
                }
                ch.queue.drain()
            });
            returned = returned.saturating_add(drained.len());
            for mbo in drained {
                mbo.finish(MboStatus::Closed, 0);
            }
        }
        info!("detach: returned {} buffers", returned);

        let Self { i2s, clkgen, .. } = self;
        let (clkgen, delay) = clkgen.into_parts();
        (i2s, clkgen, delay)
    }

    // ─── Lock helpers ───────────────────────────────────────────────────────

    /// Run `f` on channel `idx` with its lock held.
    pub(crate) fn with_channel<R>(&self, idx: ChannelIndex, f: impl FnOnce(&mut Channel) -> R) -> R {
        #[allow(clippy::indexing_slicing)] // Safety: ChannelIndex < NUM_CHANNELS by construction
        let cell = &self.channels[idx.get()];
        cell.lock(|ch| f(&mut ch.borrow_mut()))
    }

    /// Run `f` on the settings of `id` with the port lock held.
    ///
    /// May be called from inside [`with_channel`](Self::with_channel), never
    /// the other way round.
    pub(crate) fn with_port<R>(&self, id: PortId, f: impl FnOnce(&mut PortConfig) -> R) -> R {
        #[allow(clippy::indexing_slicing)] // Safety: PortId::index() < NUM_PORTS
        let cell = &self.ports[id.index()];
        cell.lock(|cfg| f(&mut cfg.borrow_mut()))
    }

    /// Currently selected clock source.
    pub fn clock_source(&self) -> ClockSource {
        self.clock_source.lock(Cell::get)
    }

    /// Select the clock source used by the next lock attempt.
    pub fn set_clock_source(&self, source: ClockSource) {
        self.clock_source.lock(|cell| cell.set(source));
    }

    /// Settings of port `id`.
    pub fn port_config(&self, id: PortId) -> PortConfig {
        self.with_port(id, |cfg| *cfg)
    }

    /// Whether the bus has been enabled.
    pub fn bus_enabled(&self) -> bool {
        self.bus_enabled.load(Ordering::Acquire)
    }
}

impl<I, C, D> StreamInterface for Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: DelayNs,
{
    type Error = Error;

    fn capabilities(&self) -> &[ChannelCapability] {
        Device::capabilities(self)
    }

    fn configure(
        &self,
        channel: usize,
        config: ChannelConfig,
    ) -> impl core::future::Future<Output = Result<(), Error>> {
        Device::configure(self, channel, config)
    }

    fn enqueue(&self, channel: usize, mbo: Mbo) -> Result<(), Rejected<Error>> {
        Device::enqueue(self, channel, mbo)
    }

    fn poison(&self, channel: usize) -> Result<(), Error> {
        Device::poison(self, channel)
    }
}
