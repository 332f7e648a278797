//! Engine error taxonomy.
//!
//! Every fallible engine operation returns [`Error`] synchronously to its
//! caller. Hardware faults seen by the interrupt path (FIFO overflow and
//! underflow) are never surfaced here; they are recorded as channel flags
//! and show up in [`crate::ChannelStatus`].

/// Argument rejected with [`Error::InvalidArgument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Invalid {
    /// Channel data type is not the streaming (synchronous) type.
    #[error("unsupported data type")]
    DataType,
    /// Buffer size differs from the fixed streaming buffer size.
    #[error("buffer size must equal the streaming buffer size")]
    BufferSize,
    /// Buffer length is not a whole number of quadlets.
    #[error("buffer length is not quadlet aligned")]
    Alignment,
    /// Buffer length exceeds the memory region backing the buffer.
    #[error("buffer length exceeds its memory region")]
    Length,
    /// Unrecognised text written to a control attribute.
    #[error("unrecognised control value")]
    ControlValue,
    /// Operation does not apply to the channel's direction.
    #[error("operation not valid for the channel direction")]
    Direction,
}

/// Errors returned by the channel engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel index outside `0..NUM_CHANNELS`.
    #[error("channel index {index} out of range")]
    Range {
        /// The rejected index.
        index: usize,
    },
    /// Operation not valid in the channel's current state.
    #[error("operation not valid in the current channel state")]
    State,
    /// A request argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(Invalid),
    /// Buffer has no bus address.
    #[error("buffer has no memory region")]
    Fault,
    /// Clock generator failed to lock, or no port could be brought up.
    #[error("clock generator not locked or no port activatable")]
    NoDevice,
    /// Nothing to transfer yet; try again on the next service pass.
    #[error("no buffer available, try again")]
    Again,
    /// Pending queue already holds the maximum number of buffers.
    #[error("pending queue full")]
    QueueFull,
}

impl From<Invalid> for Error {
    fn from(invalid: Invalid) -> Self {
        Error::InvalidArgument(invalid)
    }
}

/// Engine result type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
