//! Port configuration store.
//!
//! The core has two ports, each serving four channels with one clock
//! configuration (master/slave, bit clock speed, data format). Settings are
//! plain state until the bus is enabled, at which point every enabled and
//! fully defined port is programmed with [`program`].
//!
//! Every setting has an explicit `Undefined` member: a port with any field
//! undefined is never programmed, even when enabled.

use core::fmt;
use core::str::FromStr;

use platform::RegisterBus;

use crate::error::{Error, Invalid};
use crate::regs::{DCCRA, DCCRB, IO_MODE, PORT_EN, PORT_RST};

/// One of the two physical ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    /// Channels 0–3.
    A,
    /// Channels 4–7.
    B,
}

impl PortId {
    /// Both ports.
    pub const ALL: [PortId; 2] = [PortId::A, PortId::B];

    /// Array index of the port.
    pub const fn index(self) -> usize {
        match self {
            PortId::A => 0,
            PortId::B => 1,
        }
    }

    /// Word offset of the port's configuration register.
    pub const fn register(self) -> usize {
        match self {
            PortId::A => DCCRA,
            PortId::B => DCCRB,
        }
    }

    /// Lower-case port letter.
    pub const fn as_str(self) -> &'static str {
        match self {
            PortId::A => "a",
            PortId::B => "b",
        }
    }
}

/// Port clock direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    /// Not set.
    #[default]
    Undefined,
    /// Port drives the bit and frame clocks.
    Master,
    /// Port follows external clocks.
    Slave,
}

/// Bit clock speed as a multiple of the frame sync rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSpeed {
    /// Not set.
    #[default]
    Undefined,
    /// 8 × FS.
    Fs8,
    /// 16 × FS.
    Fs16,
    /// 32 × FS.
    Fs32,
    /// 64 × FS.
    Fs64,
    /// 128 × FS.
    Fs128,
    /// 256 × FS.
    Fs256,
    /// 512 × FS.
    Fs512,
}

/// Frame layout on the serial data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataFormat {
    /// Not set.
    #[default]
    Undefined,
    /// Classic I2S (data delayed by one bit clock).
    Delayed,
    /// Delayed, channels sequential.
    DelayedSeq,
    /// Sequential.
    Seq,
    /// Left-justified, one channel.
    LeftMono,
    /// Left-justified, two channels.
    LeftStereo,
    /// Right-justified, one channel.
    RightMono,
    /// Right-justified, two channels.
    RightStereo,
}

/// Text used for any undefined setting.
pub const UNDEFINED: &str = "undefined";

impl ClockMode {
    const DEFINED: [ClockMode; 2] = [ClockMode::Master, ClockMode::Slave];

    /// Port register bits, `None` when undefined.
    pub const fn register_bits(self) -> Option<u32> {
        match self {
            ClockMode::Undefined => None,
            ClockMode::Master => Some(0x0000_8000),
            ClockMode::Slave => Some(0x0000_0000),
        }
    }

    /// Control-surface name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClockMode::Undefined => UNDEFINED,
            ClockMode::Master => "master",
            ClockMode::Slave => "slave",
        }
    }
}

impl ClockSpeed {
    const DEFINED: [ClockSpeed; 7] = [
        ClockSpeed::Fs8,
        ClockSpeed::Fs16,
        ClockSpeed::Fs32,
        ClockSpeed::Fs64,
        ClockSpeed::Fs128,
        ClockSpeed::Fs256,
        ClockSpeed::Fs512,
    ];

    /// Port register bits, `None` when undefined.
    pub const fn register_bits(self) -> Option<u32> {
        match self {
            ClockSpeed::Undefined => None,
            ClockSpeed::Fs8 => Some(0x0000_0000),
            ClockSpeed::Fs16 => Some(0x0004_0000),
            ClockSpeed::Fs32 => Some(0x0008_0000),
            ClockSpeed::Fs64 => Some(0x000C_0000),
            ClockSpeed::Fs128 => Some(0x0010_0000),
            ClockSpeed::Fs256 => Some(0x0014_0000),
            ClockSpeed::Fs512 => Some(0x0018_0000),
        }
    }

    /// Control-surface name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClockSpeed::Undefined => UNDEFINED,
            ClockSpeed::Fs8 => "8fs",
            ClockSpeed::Fs16 => "16fs",
            ClockSpeed::Fs32 => "32fs",
            ClockSpeed::Fs64 => "64fs",
            ClockSpeed::Fs128 => "128fs",
            ClockSpeed::Fs256 => "256fs",
            ClockSpeed::Fs512 => "512fs",
        }
    }
}

impl DataFormat {
    const DEFINED: [DataFormat; 7] = [
        DataFormat::Delayed,
        DataFormat::DelayedSeq,
        DataFormat::Seq,
        DataFormat::LeftMono,
        DataFormat::LeftStereo,
        DataFormat::RightMono,
        DataFormat::RightStereo,
    ];

    /// Port register bits, `None` when undefined.
    ///
    /// Mono and stereo variants of one justification share an encoding;
    /// they differ only in the per-channel byte-count field.
    pub const fn register_bits(self) -> Option<u32> {
        match self {
            DataFormat::Undefined => None,
            DataFormat::Delayed => Some(0x0000_0800),
            DataFormat::DelayedSeq => Some(0x0000_1800),
            DataFormat::Seq => Some(0x0000_1000),
            DataFormat::LeftMono | DataFormat::LeftStereo => Some(0x0000_0400),
            DataFormat::RightMono | DataFormat::RightStereo => Some(0x0000_0000),
        }
    }

    /// Control-surface name.
    pub const fn as_str(self) -> &'static str {
        match self {
            DataFormat::Undefined => UNDEFINED,
            DataFormat::Delayed => "delayed",
            DataFormat::DelayedSeq => "delayed_seq",
            DataFormat::Seq => "seq",
            DataFormat::LeftMono => "left_mono",
            DataFormat::LeftStereo => "left_stereo",
            DataFormat::RightMono => "right_mono",
            DataFormat::RightStereo => "right_stereo",
        }
    }
}

macro_rules! text_encoding {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        // Only defined members parse; "undefined" is rejected.
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::DEFINED
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or(Error::InvalidArgument(Invalid::ControlValue))
            }
        }
    )*};
}

text_encoding!(ClockMode, ClockSpeed, DataFormat);

// ─── Byte-count field ───────────────────────────────────────────────────────

const SEQ_SHIFT: u32 = 10;
const SEQ_MASK: u32 = 0x0001_FC00;
const LEFT_SHIFT: u32 = 10;
const LEFT_MASK: u32 = 0x0000_FC00;
const RIGHT_SHIFT: u32 = 16;
const RIGHT_MASK: u32 = 0x003F_0000;

/// Byte-count field of a channel control register.
///
/// | Format                    | Encoding                                   |
/// |---------------------------|--------------------------------------------|
/// | undefined                 | `0`                                        |
/// | left mono                 | `bpf` in the left field                    |
/// | right mono                | `bpf` in the right field                   |
/// | left / right stereo       | `bpf / 2` in both the left and right field |
/// | delayed, delayed seq, seq | `bpf` in the wider sequential field        |
pub fn byte_count_field(format: DataFormat, bytes_per_frame: u8) -> u32 {
    let bpf = u32::from(bytes_per_frame);
    let half = bpf / 2;
    match format {
        DataFormat::Undefined => 0,
        DataFormat::LeftMono => bpf.wrapping_shl(LEFT_SHIFT) & LEFT_MASK,
        DataFormat::RightMono => bpf.wrapping_shl(RIGHT_SHIFT) & RIGHT_MASK,
        DataFormat::LeftStereo | DataFormat::RightStereo => {
            (half.wrapping_shl(LEFT_SHIFT) & LEFT_MASK) | (half.wrapping_shl(RIGHT_SHIFT) & RIGHT_MASK)
        }
        DataFormat::Delayed | DataFormat::DelayedSeq | DataFormat::Seq => {
            bpf.wrapping_shl(SEQ_SHIFT) & SEQ_MASK
        }
    }
}

// ─── Port configuration ─────────────────────────────────────────────────────

/// Settings of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortConfig {
    /// Clock direction.
    pub clock_mode: ClockMode,
    /// Bit clock speed.
    pub clock_speed: ClockSpeed,
    /// Frame layout.
    pub data_format: DataFormat,
    /// Port takes part in bus enable.
    pub enabled: bool,
}

impl PortConfig {
    /// Full port register value, `None` while any setting is undefined.
    pub fn register_value(&self) -> Option<u32> {
        let mode = self.clock_mode.register_bits()?;
        let speed = self.clock_speed.register_bits()?;
        let format = self.data_format.register_bits()?;
        Some(PORT_EN | IO_MODE | mode | speed | format)
    }

    /// Enabled and fully defined.
    pub fn is_activatable(&self) -> bool {
        self.enabled && self.register_value().is_some()
    }

    /// Enabled in master mode (needs the clock generator locked).
    pub fn needs_clock(&self) -> bool {
        self.enabled && self.clock_mode == ClockMode::Master
    }
}

/// Restart `port` cleanly and program it with `value`.
///
/// Sequence: clear → reset → clear → enable → full configuration.
pub fn program<B: RegisterBus>(bus: &B, port: PortId, value: u32) {
    let reg = port.register();
    bus.write(reg, 0);
    bus.write(reg, PORT_RST);
    bus.write(reg, 0);
    bus.write(reg, PORT_EN);
    bus.write(reg, value);
}

/// Put `port` back into a clean, disabled state: clear → reset → clear.
pub fn shutdown<B: RegisterBus>(bus: &B, port: PortId) {
    let reg = port.register();
    bus.write(reg, 0);
    bus.write(reg, PORT_RST);
    bus.write(reg, 0);
}
