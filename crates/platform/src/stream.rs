//! Buffer-exchange framework contract.
//!
//! Higher layers move media data by handing caller-owned buffers ([`Mbo`],
//! "memory buffer object") to a hardware interface implementing
//! [`StreamInterface`]. The interface owns each buffer from a successful
//! [`enqueue`](StreamInterface::enqueue) until it calls [`Mbo::complete`],
//! which consumes the buffer and returns it through the caller's
//! [`MboCompletion`] handle.
//!
//! ```text
//! producer ──enqueue──► interface pending queue ──transfer──► Mbo::complete ──► MboCompletion
//!     ▲                                                                              │
//!     └──────────────────────────── buffer ownership returned ◄──────────────────────┘
//! ```
//!
//! Ownership is expressed in the types: `complete` takes `self`, so a buffer
//! cannot be completed twice, and a rejected `enqueue` returns the buffer in
//! [`Rejected`] instead of dropping it.

use core::fmt;

/// Transfer direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Hardware → memory.
    Rx,
    /// Memory → hardware.
    Tx,
}

impl Direction {
    /// Lower-case short name, for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }
}

/// Set of directions a channel can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirectionMask {
    /// Receive supported.
    pub rx: bool,
    /// Transmit supported.
    pub tx: bool,
}

impl DirectionMask {
    /// Both directions.
    pub const BOTH: Self = Self { rx: true, tx: true };

    /// Whether `direction` is in the mask.
    pub fn contains(self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.rx,
            Direction::Tx => self.tx,
        }
    }
}

/// Data type carried by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    /// Control messages.
    Control,
    /// Asynchronous packet data.
    Async,
    /// Synchronous streaming data (audio).
    Sync,
    /// Isochronous data.
    Isochronous,
}

/// Per-channel configuration requested by the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Transfer direction.
    pub direction: Direction,
    /// Data type.
    pub data_type: DataType,
    /// Number of buffers the framework will circulate.
    pub num_buffers: u16,
    /// Size of every buffer in bytes.
    pub buffer_size: usize,
    /// Bytes per frame ("subbuffer" in framework terms).
    pub subbuffer_size: u8,
}

/// Static description of what a channel supports, published once at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelCapability {
    /// Directions the channel can be configured for.
    pub direction: DirectionMask,
    /// Supported data type.
    pub data_type: DataType,
    /// Maximum number of streaming buffers.
    pub num_buffers_streaming: u16,
    /// Required streaming buffer size in bytes.
    pub buffer_size_streaming: usize,
}

/// Completion status of an [`Mbo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MboStatus {
    /// Not yet completed.
    Pending,
    /// Transfer finished; `processed_length` bytes were moved.
    Success,
    /// Channel closed; the buffer was returned unprocessed.
    Closed,
}

/// Receiver of completed buffers.
///
/// Called from whichever context finished the buffer (producer, deferred
/// worker). Implementations must not block.
pub trait MboCompletion {
    /// Take back ownership of a completed buffer.
    fn complete(&self, mbo: Mbo);
}

/// Caller-owned buffer descriptor.
pub struct Mbo {
    /// Backing memory. `None` models a buffer without a bus address.
    pub memory: Option<&'static mut [u8]>,
    /// Number of valid (Tx) or requested (Rx) bytes.
    pub buffer_length: usize,
    /// Bytes actually transferred; set on completion.
    pub processed_length: usize,
    /// Completion status.
    pub status: MboStatus,
    /// Opaque caller value, untouched by the interface.
    pub context: usize,
    completion: &'static (dyn MboCompletion + Sync),
}

impl Mbo {
    /// Create a pending buffer over `memory`, using its full length.
    pub fn new(memory: &'static mut [u8], completion: &'static (dyn MboCompletion + Sync)) -> Self {
        let buffer_length = memory.len();
        Self {
            memory: Some(memory),
            buffer_length,
            processed_length: 0,
            status: MboStatus::Pending,
            context: 0,
            completion,
        }
    }

    /// Create a pending buffer that has no backing memory.
    pub fn unmapped(buffer_length: usize, completion: &'static (dyn MboCompletion + Sync)) -> Self {
        Self {
            memory: None,
            buffer_length,
            processed_length: 0,
            status: MboStatus::Pending,
            context: 0,
            completion,
        }
    }

    /// Set the caller context value.
    #[must_use]
    pub fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }

    /// Set `buffer_length`.
    #[must_use]
    pub fn with_length(mut self, buffer_length: usize) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    /// Hand the buffer back to its owner.
    pub fn complete(self) {
        let completion = self.completion;
        completion.complete(self);
    }

    /// Record the outcome and hand the buffer back.
    pub fn finish(mut self, status: MboStatus, processed_length: usize) {
        self.status = status;
        self.processed_length = processed_length;
        self.complete();
    }
}

impl fmt::Debug for Mbo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbo")
            .field("mapped", &self.memory.is_some())
            .field("buffer_length", &self.buffer_length)
            .field("processed_length", &self.processed_length)
            .field("status", &self.status)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A buffer refused by [`StreamInterface::enqueue`], returned to the caller.
#[derive(Debug)]
pub struct Rejected<E> {
    /// Why the buffer was refused.
    pub error: E,
    /// The untouched buffer.
    pub mbo: Mbo,
}

/// Hardware interface as seen by the buffer-exchange framework.
pub trait StreamInterface {
    /// Error type
    type Error: core::fmt::Debug;

    /// Capability vector, one entry per channel.
    fn capabilities(&self) -> &[ChannelCapability];

    /// Prepare channel `channel` for streaming with `config`.
    fn configure(
        &self,
        channel: usize,
        config: ChannelConfig,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Hand a buffer to the channel.
    fn enqueue(&self, channel: usize, mbo: Mbo) -> Result<(), Rejected<Self::Error>>;

    /// Stop the channel and return every pending buffer as closed.
    fn poison(&self, channel: usize) -> Result<(), Self::Error>;
}
