//! Clock generator lock controller.
//!
//! The I2S core's master clocks come from an MMCM inside a separate clock
//! generator IP block. Before a channel may be configured (and before a
//! master port is brought up) the MMCM must report lock for the selected
//! [`ClockSource`].
//!
//! # Lock sequence
//!
//! ```text
//! DIV ← 0
//! CFG ← source            wait 200 µs   (source must be stable before reset)
//! CFG ← RESET | source    wait  10 µs
//! CFG ← source            wait 200 µs
//! poll LOCKED ─ no ─► reset pulse ─► poll … (at most MAX_LOCK_ATTEMPTS polls)
//! ```
//!
//! The settle times are awaited through [`DelayNs`], never busy-waited under
//! a lock, so interrupts keep running while the MMCM settles. The async
//! mutex serialises concurrent lock sequences from different callers.

use core::fmt;
use core::str::FromStr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use platform::RegisterBus;

use crate::error::{Error, Invalid};
use crate::regs::{CLKGEN_CFG, CLKGEN_DIV, CLKGEN_DIV_NONE, CLK_SEL_MASK, MMCM_LOCKED, MMCM_RESET};

/// Maximum number of lock polls before [`Error::NoDevice`] is reported.
pub const MAX_LOCK_ATTEMPTS: u8 = 5;

/// Settle time after selecting a source or releasing reset, in µs.
pub const SETTLE_US: u32 = 200;

/// Width of the MMCM reset pulse, in µs.
pub const RESET_PULSE_US: u32 = 10;

/// Input clock feeding the MMCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// PHY 1, recovered master clock 0.
    #[default]
    Phy1Rmck0,
    /// PHY 1, recovered master clock 1.
    Phy1Rmck1,
    /// PHY 2, recovered master clock 0.
    Phy2Rmck0,
    /// PHY 2, recovered master clock 1.
    Phy2Rmck1,
    /// Debug clock input.
    DbgClk,
    /// On-board oscillator 1.
    Osc1Clk,
    /// On-board oscillator 2.
    Osc2Clk,
    /// On-board oscillator 3.
    Osc3Clk,
}

impl ClockSource {
    /// Every source, in register-encoding order.
    pub const ALL: [ClockSource; 8] = [
        ClockSource::Phy1Rmck0,
        ClockSource::Phy1Rmck1,
        ClockSource::Phy2Rmck0,
        ClockSource::Phy2Rmck1,
        ClockSource::DbgClk,
        ClockSource::Osc1Clk,
        ClockSource::Osc2Clk,
        ClockSource::Osc3Clk,
    ];

    /// Source-select field value for the configuration register.
    pub const fn register_bits(self) -> u32 {
        match self {
            ClockSource::Phy1Rmck0 => 0x0000_0000,
            ClockSource::Phy1Rmck1 => 0x0400_0000,
            ClockSource::Phy2Rmck0 => 0x0800_0000,
            ClockSource::Phy2Rmck1 => 0x0C00_0000,
            ClockSource::DbgClk => 0x1000_0000,
            ClockSource::Osc1Clk => 0x1400_0000,
            ClockSource::Osc2Clk => 0x1800_0000,
            ClockSource::Osc3Clk => 0x1C00_0000,
        }
    }

    /// Control-surface name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClockSource::Phy1Rmck0 => "phy1_rmck0",
            ClockSource::Phy1Rmck1 => "phy1_rmck1",
            ClockSource::Phy2Rmck0 => "phy2_rmck0",
            ClockSource::Phy2Rmck1 => "phy2_rmck1",
            ClockSource::DbgClk => "dbg_clk",
            ClockSource::Osc1Clk => "osc1_clk",
            ClockSource::Osc2Clk => "osc2_clk",
            ClockSource::Osc3Clk => "osc3_clk",
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClockSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClockSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or(Error::InvalidArgument(Invalid::ControlValue))
    }
}

/// Driver for the clock generator register block.
pub struct ClockGenerator<B, D> {
    regs: B,
    delay: Mutex<CriticalSectionRawMutex, D>,
}

impl<B: RegisterBus, D: DelayNs> ClockGenerator<B, D> {
    /// Wrap the clock generator register window and a delay provider.
    pub fn new(regs: B, delay: D) -> Self {
        Self {
            regs,
            delay: Mutex::new(delay),
        }
    }

    /// Raw lock status of the MMCM.
    pub fn is_locked(&self) -> bool {
        self.regs.read(CLKGEN_CFG) & MMCM_LOCKED != 0
    }

    /// Run the full lock sequence for `source`.
    ///
    /// Returns the number of polls it took to observe lock (`1..=5`).
    ///
    /// # Errors
    ///
    /// [`Error::NoDevice`] when the MMCM is still unlocked after
    /// [`MAX_LOCK_ATTEMPTS`] polls. Callers treat this as fatal for the
    /// activation attempt.
    pub async fn try_lock(&self, source: ClockSource) -> Result<u8, Error> {
        let mut delay = self.delay.lock().await;
        let select = source.register_bits() & CLK_SEL_MASK;

        self.regs.write(CLKGEN_DIV, CLKGEN_DIV_NONE);
        self.regs.write(CLKGEN_CFG, select);
        delay.delay_us(SETTLE_US).await;
        self.reset_pulse(&mut *delay, select).await;

        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            if self.is_locked() {
                info!("clkgen: {} locked after {} attempt(s)", source.as_str(), attempt);
                return Ok(attempt);
            }
            warn!("clkgen: {} not locked, attempt {}", source.as_str(), attempt);
            self.reset_pulse(&mut *delay, select).await;
        }

        error!("clkgen: {} failed to lock", source.as_str());
        Err(Error::NoDevice)
    }

    /// Make sure the MMCM is locked, relocking onto `source` if it is not.
    ///
    /// Returns `0` when it was already locked, otherwise the attempts used by
    /// [`try_lock`](Self::try_lock).
    pub async fn check_locked(&self, source: ClockSource) -> Result<u8, Error> {
        if self.is_locked() {
            return Ok(0);
        }
        info!("clkgen: not locked, relocking onto {}", source.as_str());
        self.try_lock(source).await
    }

    async fn reset_pulse(&self, delay: &mut D, select: u32) {
        self.regs.write(CLKGEN_CFG, MMCM_RESET | select);
        delay.delay_us(RESET_PULSE_US).await;
        self.regs.write(CLKGEN_CFG, select);
        delay.delay_us(SETTLE_US).await;
    }

    /// Give back the register window and delay provider.
    pub fn into_parts(self) -> (B, D) {
        (self.regs, self.delay.into_inner())
    }
}
