//! Shared test rig: mock register windows, counting delay, buffer helpers.

#![allow(dead_code)]

use i2s_engine::regs::{CLKGEN_CFG, MMCM_LOCKED};
use i2s_engine::{DataFormat, Device, PortId, BUFFER_SIZE};
use platform::mocks::{leak_buffer, leak_words, MockDelay, MockRegisters, RecordingCompletion};
use platform::{ChannelConfig, DataType, Direction, Mbo};

pub type TestDevice<'a> = Device<&'a MockRegisters, &'a MockRegisters, MockDelay>;

/// Hardware behind one device under test.
pub struct Rig {
    pub i2s: MockRegisters,
    pub clk: MockRegisters,
    pub delay: MockDelay,
}

impl Rig {
    /// Clock generator permanently reporting lock.
    pub fn locked() -> Self {
        let rig = Self::unlocked();
        rig.clk.force_bits(CLKGEN_CFG, MMCM_LOCKED);
        rig
    }

    /// Clock generator never locking.
    pub fn unlocked() -> Self {
        Self {
            i2s: MockRegisters::new(),
            clk: MockRegisters::new(),
            delay: MockDelay::new(),
        }
    }

    pub fn device(&self) -> TestDevice<'_> {
        Device::new(&self.i2s, &self.clk, self.delay.clone(), 42)
    }

    /// Device with both ports using `format`.
    pub fn device_with_format(&self, format: DataFormat) -> TestDevice<'_> {
        let dev = self.device();
        for id in PortId::ALL {
            dev.set_data_format(id, format);
        }
        dev
    }
}

/// Valid streaming configuration, 4 bytes per frame.
pub fn streaming(direction: Direction) -> ChannelConfig {
    ChannelConfig {
        direction,
        data_type: DataType::Sync,
        num_buffers: 32,
        buffer_size: BUFFER_SIZE,
        subbuffer_size: 4,
    }
}

/// Buffer holding `words`, tagged with `context`.
pub fn words_buffer(sink: &'static RecordingCompletion, context: usize, words: &[u32]) -> Mbo {
    Mbo::new(leak_words(words), sink).with_context(context)
}

/// Zeroed buffer of `len` bytes, tagged with `context`.
pub fn zero_buffer(sink: &'static RecordingCompletion, context: usize, len: usize) -> Mbo {
    Mbo::new(leak_buffer(len), sink).with_context(context)
}
