//! Channel state machine.
//!
//! ```text
//!                configure               Tx: PREFILL_THRESHOLD enqueues
//! Uninitialized ───────────► Initialized ─────────────────────────────► Enabled
//!       ▲                         │        Rx: activate_rx                 │
//!       └──────── poison ─────────┴────────────────────────────────────────┘
//! ```
//!
//! All transitions happen with the channel lock held. Hardware enable and
//! disable sequences (status clear, port interrupt-enable bit, channel
//! enable bit) run inside the same critical section as the state change, so
//! `poison` stops the hardware before it drains the queue.

use platform::{ChannelConfig, DataType, Direction, Mbo, MboStatus, RegisterBus, Rejected};

use crate::device::{Device, BUFFER_SIZE, CHANNELS_PER_PORT, NUM_CHANNELS, PREFILL_THRESHOLD};
use crate::error::{Error, Invalid, Result};
use crate::port::{byte_count_field, PortId};
use crate::queue::PendingQueue;
use crate::regs::{
    BETR, BFTR, CCR, CHANNEL_EN, CHANNEL_RESET, CHANNEL_TX, CLEAR_ALL, CSR, QUADLETS_THRESHOLD,
    RX_INT_MASK, RX_INT_UNMASK, RX_SERV_REQ, TX_INT_MASK, TX_INT_UNMASK, TX_SERV_REQ, UNMASK_ALL,
};

/// Validated channel number in `0..NUM_CHANNELS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// Validate `index`.
    pub fn new(index: usize) -> Result<Self> {
        if index < NUM_CHANNELS {
            u8::try_from(index)
                .map(Self)
                .map_err(|_| Error::Range { index })
        } else {
            Err(Error::Range { index })
        }
    }

    /// Every channel, in index order.
    pub fn all() -> impl Iterator<Item = ChannelIndex> {
        (0..NUM_CHANNELS).filter_map(|i| ChannelIndex::new(i).ok())
    }

    /// The raw index.
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Port serving this channel (0–3 → A, 4–7 → B).
    pub const fn port(self) -> PortId {
        if self.get() < CHANNELS_PER_PORT {
            PortId::A
        } else {
            PortId::B
        }
    }

    /// Position within the port, `0..CHANNELS_PER_PORT`.
    pub const fn port_slot(self) -> usize {
        self.get() % CHANNELS_PER_PORT
    }

    /// Interrupt-enable bit of this channel in its port register.
    #[allow(clippy::arithmetic_side_effects)] // Safety: port_slot() < 4
    pub const fn port_bit(self) -> u32 {
        1u32 << self.port_slot()
    }

    /// Bit of this channel in the global status register.
    #[allow(clippy::arithmetic_side_effects)] // Safety: index < 8
    pub const fn status_bit(self) -> u32 {
        1u32 << self.0
    }

    /// Word offset of `register` in this channel's block.
    pub const fn reg(self, register: usize) -> usize {
        crate::regs::channel_reg(self.get(), register)
    }
}

impl TryFrom<usize> for ChannelIndex {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        ChannelIndex::new(index)
    }
}

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    /// Not configured (initial, and after `poison`).
    Uninitialized,
    /// Configured, hardware channel not yet enabled.
    Initialized,
    /// Hardware channel enabled and streaming.
    Enabled,
}

impl ChannelState {
    /// Lower-case name, for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelState::Uninitialized => "uninitialized",
            ChannelState::Initialized => "initialized",
            ChannelState::Enabled => "enabled",
        }
    }
}

/// Snapshot of one channel, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    /// Lifecycle state.
    pub state: ChannelState,
    /// Configured direction.
    pub direction: Direction,
    /// Configured bytes per frame.
    pub bytes_per_frame: u8,
    /// Waiting for the deferred worker.
    pub ready: bool,
    /// A FIFO overflow was seen since the last `configure`.
    pub fifo_overflow: bool,
    /// A FIFO underflow was seen since the last `configure`.
    pub fifo_underflow: bool,
    /// Buffers waiting in the pending queue.
    pub pending: usize,
    /// Tx buffers counted towards the pre-fill threshold.
    pub prefill_count: u8,
}

/// Mutable per-channel state, guarded by the channel lock.
#[derive(Debug)]
pub(crate) struct Channel {
    pub(crate) state: ChannelState,
    pub(crate) direction: Direction,
    pub(crate) bytes_per_frame: u8,
    pub(crate) ready: bool,
    pub(crate) fifo_overflow: bool,
    pub(crate) fifo_underflow: bool,
    pub(crate) prefill_count: u8,
    pub(crate) queue: PendingQueue,
    /// A buffer is being copied outside the lock.
    pub(crate) busy: bool,
    /// Bumped by every `poison`; lets lock-free work detect it went stale.
    pub(crate) generation: u32,
}

impl Channel {
    pub(crate) const fn new() -> Self {
        Self {
            state: ChannelState::Uninitialized,
            direction: Direction::Rx,
            bytes_per_frame: 0,
            ready: false,
            fifo_overflow: false,
            fifo_underflow: false,
            prefill_count: 0,
            queue: PendingQueue::new(),
            busy: false,
            generation: 0,
        }
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus {
            state: self.state,
            direction: self.direction,
            bytes_per_frame: self.bytes_per_frame,
            ready: self.ready,
            fifo_overflow: self.fifo_overflow,
            fifo_underflow: self.fifo_underflow,
            pending: self.queue.len(),
            prefill_count: self.prefill_count,
        }
    }
}

// ─── Direction-specific register bits ───────────────────────────────────────

/// AND-mask that re-arms the service interrupt of `direction`.
pub(crate) const fn rearm_mask(direction: Direction) -> u32 {
    match direction {
        Direction::Rx => RX_INT_MASK,
        Direction::Tx => TX_INT_MASK,
    }
}

/// OR-bit that holds the service interrupt of `direction` off.
pub(crate) const fn hold_off_bit(direction: Direction) -> u32 {
    match direction {
        Direction::Rx => RX_INT_UNMASK,
        Direction::Tx => TX_INT_UNMASK,
    }
}

/// Service-request status bit of `direction`.
pub(crate) const fn service_bit(direction: Direction) -> u32 {
    match direction {
        Direction::Rx => RX_SERV_REQ,
        Direction::Tx => TX_SERV_REQ,
    }
}

/// Reset and program a channel's control and threshold registers.
///
/// Leaves every interrupt held off except the channel's own service class.
fn init_registers<B: RegisterBus>(bus: &B, idx: ChannelIndex, direction: Direction, byte_count: u32) {
    let ccr = idx.reg(CCR);
    let dir = match direction {
        Direction::Rx => 0,
        Direction::Tx => CHANNEL_TX,
    };
    bus.write(ccr, CHANNEL_RESET);
    bus.write(ccr, 0);
    bus.write(ccr, dir | byte_count | UNMASK_ALL);
    bus.modify(ccr, |v| v & rearm_mask(direction));
    bus.write(idx.reg(BFTR), QUADLETS_THRESHOLD);
    bus.write(idx.reg(BETR), QUADLETS_THRESHOLD);
}

/// What `enqueue` does once the buffer is queued and the lock released.
enum AfterEnqueue {
    Queued,
    StartTx(u32),
    WakeWorker,
}

/// Validate a buffer handed to `enqueue`.
fn check_buffer(mbo: &Mbo) -> Result<()> {
    let Some(memory) = mbo.memory.as_deref() else {
        return Err(Error::Fault);
    };
    if mbo.buffer_length % 4 != 0 {
        warn!("buffer length {} not quadlet aligned", mbo.buffer_length);
        return Err(Invalid::Alignment.into());
    }
    if mbo.buffer_length > memory.len() {
        return Err(Invalid::Length.into());
    }
    Ok(())
}

impl<I, C, D> Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Prepare channel `index` for streaming.
    ///
    /// Checks, in order: index range, state (must be uninitialized), data
    /// type (must be [`DataType::Sync`]), buffer size (must be
    /// [`BUFFER_SIZE`]), clock generator lock. On success the channel's
    /// registers are reset and programmed for `config.direction` with the
    /// byte count derived from its port's data format, and the channel is
    /// [`ChannelState::Initialized`].
    pub async fn configure(&self, index: usize, config: ChannelConfig) -> Result<()> {
        let idx = ChannelIndex::new(index)?;
        if self.with_channel(idx, |ch| ch.state) != ChannelState::Uninitialized {
            return Err(Error::State);
        }
        if config.data_type != DataType::Sync {
            warn!("ch{}: unsupported data type", index);
            return Err(Invalid::DataType.into());
        }
        if config.buffer_size != BUFFER_SIZE {
            warn!("ch{}: buffer size must be {} bytes", index, BUFFER_SIZE);
            return Err(Invalid::BufferSize.into());
        }

        self.clkgen.check_locked(self.clock_source()).await?;

        self.with_channel(idx, |ch| {
            // re-checked: another configure may have won while we awaited the clock
            if ch.state != ChannelState::Uninitialized {
                return Err(Error::State);
            }
            let format = self.with_port(idx.port(), |port| port.data_format);
            let byte_count = byte_count_field(format, config.subbuffer_size);
            init_registers(&self.i2s, idx, config.direction, byte_count);

            ch.state = ChannelState::Initialized;
            ch.direction = config.direction;
            ch.bytes_per_frame = config.subbuffer_size;
            ch.ready = false;
            ch.fifo_overflow = false;
            ch.fifo_underflow = false;
            ch.prefill_count = 0;
            Ok(())
        })?;

        info!(
            "ch{}: configured {} bpf {}",
            index,
            config.direction.as_str(),
            config.subbuffer_size
        );
        Ok(())
    }

    /// Hand a buffer to channel `index`.
    ///
    /// The buffer is appended to the pending queue. On a Tx channel that is
    /// not yet enabled, the [`PREFILL_THRESHOLD`]-th buffer triggers that many
    /// immediate transfers followed by the hardware enable. On an enabled
    /// channel still marked `ready` the deferred worker is signalled.
    ///
    /// On error the untouched buffer is handed back in [`Rejected`].
    pub fn enqueue(&self, index: usize, mbo: Mbo) -> core::result::Result<(), Rejected<Error>> {
        let idx = match ChannelIndex::new(index) {
            Ok(idx) => idx,
            Err(error) => return Err(Rejected { error, mbo }),
        };

        let next = self.with_channel(idx, |ch| {
            if ch.state == ChannelState::Uninitialized {
                return Err(Rejected {
                    error: Error::State,
                    mbo,
                });
            }
            if let Err(error) = check_buffer(&mbo) {
                return Err(Rejected { error, mbo });
            }
            ch.queue.push_back(mbo).map_err(|mbo| Rejected {
                error: Error::QueueFull,
                mbo,
            })?;

            match ch.state {
                ChannelState::Initialized if ch.direction == Direction::Tx => {
                    ch.prefill_count = ch.prefill_count.saturating_add(1);
                    if usize::from(ch.prefill_count) == PREFILL_THRESHOLD {
                        return Ok(AfterEnqueue::StartTx(ch.generation));
                    }
                    Ok(AfterEnqueue::Queued)
                }
                // a pass already found this channel starved; its interrupt is
                // held off, so nothing else will bring the worker back
                ChannelState::Enabled if ch.ready => Ok(AfterEnqueue::WakeWorker),
                _ => Ok(AfterEnqueue::Queued),
            }
        })?;

        match next {
            AfterEnqueue::StartTx(generation) => self.start_tx(idx, generation),
            AfterEnqueue::WakeWorker => self.worker.signal(()),
            AfterEnqueue::Queued => {}
        }
        Ok(())
    }

    /// Stop channel `index` and return every pending buffer.
    ///
    /// The hardware channel and its port interrupt-enable bit are disabled
    /// and the channel becomes [`ChannelState::Uninitialized`] before the
    /// queue is drained, all under the channel lock. Drained buffers are then
    /// completed, oldest first, with [`MboStatus::Closed`] and zero processed
    /// length. A buffer already being copied by the worker completes normally.
    pub fn poison(&self, index: usize) -> Result<()> {
        let idx = ChannelIndex::new(index)?;
        let drained = self.with_channel(idx, |ch| {
            if ch.state == ChannelState::Uninitialized {
                return Err(Error::State);
            }
            self.disable_channel_hw(idx);
            ch.state = ChannelState::Uninitialized;
            ch.ready = false;
            ch.prefill_count = 0;
            ch.generation = ch.generation.wrapping_add(1);
            Ok(ch.queue.drain())
        })?;

        info!("ch{}: poisoned", index);
        let returned = drained.len();
        for mbo in drained {
            mbo.finish(MboStatus::Closed, 0);
        }
        info!("ch{}: returned {} buffers", index, returned);
        Ok(())
    }

    /// Enable an initialized Rx channel.
    ///
    /// Rx channels have no pre-fill; they start streaming when an external
    /// trigger (board bring-up, the consumer opening the stream) calls this.
    pub fn activate_rx(&self, index: usize) -> Result<()> {
        let idx = ChannelIndex::new(index)?;
        self.with_channel(idx, |ch| {
            if ch.state != ChannelState::Initialized {
                return Err(Error::State);
            }
            if ch.direction != Direction::Rx {
                return Err(Invalid::Direction.into());
            }
            self.enable_channel_hw(idx);
            ch.state = ChannelState::Enabled;
            Ok(())
        })?;
        info!("ch{}: rx enabled", index);
        Ok(())
    }

    /// Snapshot of channel `index`.
    pub fn status(&self, index: usize) -> Result<ChannelStatus> {
        let idx = ChannelIndex::new(index)?;
        Ok(self.with_channel(idx, |ch| ch.status()))
    }

    /// Pre-fill the Tx FIFO and enable the channel.
    ///
    /// Runs without the channel lock held across transfers. If the channel
    /// was poisoned meanwhile (`generation` changed) the enable is skipped.
    fn start_tx(&self, idx: ChannelIndex, generation: u32) {
        for _ in 0..PREFILL_THRESHOLD {
            if self.transfer_channel(idx).is_err() {
                debug!("ch{}: pre-fill transfer skipped", idx.get());
            }
        }

        let enabled = self.with_channel(idx, |ch| {
            if ch.generation != generation || ch.state != ChannelState::Initialized {
                return false;
            }
            self.enable_channel_hw(idx);
            ch.state = ChannelState::Enabled;
            true
        });
        if enabled {
            info!("ch{}: tx enabled after pre-fill", idx.get());
        } else {
            debug!("ch{}: poisoned during pre-fill", idx.get());
        }
    }

    /// Clear status, set the port interrupt-enable bit, set channel enable.
    ///
    /// Caller holds the channel lock.
    pub(crate) fn enable_channel_hw(&self, idx: ChannelIndex) {
        self.i2s.write(idx.reg(CSR), CLEAR_ALL);
        let port = idx.port();
        self.with_port(port, |_| self.i2s.set_bits(port.register(), idx.port_bit()));
        self.i2s.set_bits(idx.reg(CCR), CHANNEL_EN);
    }

    /// Clear status, clear the port interrupt-enable bit, clear channel enable.
    ///
    /// Caller holds the channel lock.
    pub(crate) fn disable_channel_hw(&self, idx: ChannelIndex) {
        self.i2s.write(idx.reg(CSR), CLEAR_ALL);
        let port = idx.port();
        self.with_port(port, |_| self.i2s.clear_bits(port.register(), idx.port_bit()));
        self.i2s.clear_bits(idx.reg(CCR), CHANNEL_EN);
    }
}
