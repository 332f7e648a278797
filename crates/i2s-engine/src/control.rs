//! Control surface: clock source, port settings and bus enable.
//!
//! Settings are exposed two ways: typed setters on [`Device`], and a textual
//! attribute layer ([`Attribute`], [`Device::show`], [`Device::store`]) for
//! a sysfs-like control interface.
//!
//! | Attribute             | Values                                                     |
//! |-----------------------|------------------------------------------------------------|
//! | `clock_source`        | `phy1_rmck0` … `osc3_clk`                                  |
//! | `port_{a,b}_enable`   | `1`, `0` (shown as `enabled` / `disabled`)                  |
//! | `port_{a,b}_clock_mode`  | `master`, `slave`                                       |
//! | `port_{a,b}_clock_speed` | `8fs` … `512fs`                                         |
//! | `port_{a,b}_data_format` | `delayed`, `delayed_seq`, `seq`, `left_mono`, …         |
//! | `bus_enable`          | `1`, `0` (shown as `enabled` / `disabled`)                  |
//!
//! Unknown text for the clock source, a port enable or the bus enable is
//! rejected and nothing changes. Unknown text for a clock mode, clock speed
//! or data format resets that field to `undefined` (which keeps the port
//! from being programmed) and is reported as an error.

use core::str::FromStr;
use core::sync::atomic::Ordering;

use embedded_hal_async::delay::DelayNs;
use platform::RegisterBus;

use crate::clkgen::ClockSource;
use crate::device::Device;
use crate::error::{Error, Invalid, Result};
use crate::port::{self, ClockMode, ClockSpeed, DataFormat, PortId};

const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

/// A named control attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attribute {
    /// Clock generator input.
    ClockSource,
    /// Port A takes part in bus enable.
    PortAEnable,
    /// Port A clock direction.
    PortAClockMode,
    /// Port A bit clock speed.
    PortAClockSpeed,
    /// Port A frame layout.
    PortADataFormat,
    /// Port B takes part in bus enable.
    PortBEnable,
    /// Port B clock direction.
    PortBClockMode,
    /// Port B bit clock speed.
    PortBClockSpeed,
    /// Port B frame layout.
    PortBDataFormat,
    /// Bus enable: `1` activates, `0` shuts the ports down.
    BusEnable,
}

#[derive(Clone, Copy)]
enum PortField {
    Enable,
    ClockMode,
    ClockSpeed,
    DataFormat,
}

#[derive(Clone, Copy)]
enum Target {
    ClockSource,
    Port(PortId, PortField),
    Bus,
}

impl Attribute {
    /// Every attribute, in presentation order.
    pub const ALL: [Attribute; 10] = [
        Attribute::ClockSource,
        Attribute::PortAEnable,
        Attribute::PortAClockMode,
        Attribute::PortAClockSpeed,
        Attribute::PortADataFormat,
        Attribute::PortBEnable,
        Attribute::PortBClockMode,
        Attribute::PortBClockSpeed,
        Attribute::PortBDataFormat,
        Attribute::BusEnable,
    ];

    /// Attribute file name.
    pub const fn name(self) -> &'static str {
        match self {
            Attribute::ClockSource => "clock_source",
            Attribute::PortAEnable => "port_a_enable",
            Attribute::PortAClockMode => "port_a_clock_mode",
            Attribute::PortAClockSpeed => "port_a_clock_speed",
            Attribute::PortADataFormat => "port_a_data_format",
            Attribute::PortBEnable => "port_b_enable",
            Attribute::PortBClockMode => "port_b_clock_mode",
            Attribute::PortBClockSpeed => "port_b_clock_speed",
            Attribute::PortBDataFormat => "port_b_data_format",
            Attribute::BusEnable => "bus_enable",
        }
    }

    const fn target(self) -> Target {
        match self {
            Attribute::ClockSource => Target::ClockSource,
            Attribute::PortAEnable => Target::Port(PortId::A, PortField::Enable),
            Attribute::PortAClockMode => Target::Port(PortId::A, PortField::ClockMode),
            Attribute::PortAClockSpeed => Target::Port(PortId::A, PortField::ClockSpeed),
            Attribute::PortADataFormat => Target::Port(PortId::A, PortField::DataFormat),
            Attribute::PortBEnable => Target::Port(PortId::B, PortField::Enable),
            Attribute::PortBClockMode => Target::Port(PortId::B, PortField::ClockMode),
            Attribute::PortBClockSpeed => Target::Port(PortId::B, PortField::ClockSpeed),
            Attribute::PortBDataFormat => Target::Port(PortId::B, PortField::DataFormat),
            Attribute::BusEnable => Target::Bus,
        }
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or(Error::InvalidArgument(Invalid::ControlValue))
    }
}

/// `1` / `0` switch text.
fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(Invalid::ControlValue.into()),
    }
}

const fn enabled_text(on: bool) -> &'static str {
    if on {
        ENABLED
    } else {
        DISABLED
    }
}

impl<I, C, D> Device<I, C, D>
where
    I: RegisterBus,
    C: RegisterBus,
    D: DelayNs,
{
    // ─── Typed setters ──────────────────────────────────────────────────────

    /// Include or exclude port `id` from bus enable.
    pub fn set_port_enabled(&self, id: PortId, enabled: bool) {
        self.with_port(id, |cfg| cfg.enabled = enabled);
    }

    /// Set the clock direction of port `id`.
    pub fn set_clock_mode(&self, id: PortId, mode: ClockMode) {
        self.with_port(id, |cfg| cfg.clock_mode = mode);
    }

    /// Set the bit clock speed of port `id`.
    pub fn set_clock_speed(&self, id: PortId, speed: ClockSpeed) {
        self.with_port(id, |cfg| cfg.clock_speed = speed);
    }

    /// Set the frame layout of port `id`.
    ///
    /// Takes effect for channels configured afterwards (byte-count field)
    /// and at the next bus enable (port register).
    pub fn set_data_format(&self, id: PortId, format: DataFormat) {
        self.with_port(id, |cfg| cfg.data_format = format);
    }

    // ─── Bus enable ─────────────────────────────────────────────────────────

    /// Bring the enabled ports up.
    ///
    /// Locks the clock generator first if any enabled port is master, then
    /// programs every enabled, fully defined port. A no-op while the bus is
    /// already enabled.
    ///
    /// # Errors
    ///
    /// [`Error::NoDevice`] when the clock generator does not lock or when no
    /// port could be programmed. The bus stays disabled.
    pub async fn enable_bus(&self) -> Result<()> {
        let _serial = self.bus_lock.lock().await;
        if self.bus_enabled.load(Ordering::Acquire) {
            return Ok(());
        }

        if PortId::ALL.into_iter().any(|id| self.port_config(id).needs_clock()) {
            let source = self.clock_source();
            if let Err(err) = self.clkgen.try_lock(source).await {
                warn!("bus: clock generator not locked, bus stays disabled");
                return Err(err);
            }
        }

        let mut programmed: u8 = 0;
        for id in PortId::ALL {
            let done = self.with_port(id, |cfg| match cfg.register_value() {
                Some(value) if cfg.enabled => {
                    port::program(&self.i2s, id, value);
                    true
                }
                _ => false,
            });
            if done {
                info!("bus: port {} programmed", id.as_str());
                programmed = programmed.saturating_add(1);
            }
        }

        if programmed == 0 {
            warn!("bus: no port enabled");
            return Err(Error::NoDevice);
        }
        self.bus_enabled.store(true, Ordering::Release);
        info!("bus: enabled");
        Ok(())
    }

    /// Shut the enabled ports down. A no-op while the bus is disabled.
    pub async fn disable_bus(&self) {
        let _serial = self.bus_lock.lock().await;
        if !self.bus_enabled.load(Ordering::Acquire) {
            return;
        }
        for id in PortId::ALL {
            self.with_port(id, |cfg| {
                if cfg.enabled {
                    port::shutdown(&self.i2s, id);
                }
            });
        }
        self.bus_enabled.store(false, Ordering::Release);
        info!("bus: disabled");
    }

    // ─── Text attributes ────────────────────────────────────────────────────

    /// Current value of `attr` as text.
    pub fn show(&self, attr: Attribute) -> &'static str {
        match attr.target() {
            Target::ClockSource => self.clock_source().as_str(),
            Target::Bus => enabled_text(self.bus_enabled()),
            Target::Port(id, field) => {
                let cfg = self.port_config(id);
                match field {
                    PortField::Enable => enabled_text(cfg.enabled),
                    PortField::ClockMode => cfg.clock_mode.as_str(),
                    PortField::ClockSpeed => cfg.clock_speed.as_str(),
                    PortField::DataFormat => cfg.data_format.as_str(),
                }
            }
        }
    }

    /// Write `text` to `attr`. Trailing whitespace (the newline written by
    /// `echo`) is ignored.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(ControlValue)` for unrecognised text
    /// - [`Error::NoDevice`] when bus enable fails
    pub async fn store(&self, attr: Attribute, text: &str) -> Result<()> {
        let value = text.trim_end();
        let result = match attr.target() {
            Target::ClockSource => value
                .parse::<ClockSource>()
                .map(|source| self.set_clock_source(source)),
            Target::Port(id, PortField::Enable) => {
                parse_switch(value).map(|on| self.set_port_enabled(id, on))
            }
            Target::Port(id, PortField::ClockMode) => {
                let mode = value.parse::<ClockMode>();
                self.set_clock_mode(id, mode.unwrap_or_default());
                mode.map(drop)
            }
            Target::Port(id, PortField::ClockSpeed) => {
                let speed = value.parse::<ClockSpeed>();
                self.set_clock_speed(id, speed.unwrap_or_default());
                speed.map(drop)
            }
            Target::Port(id, PortField::DataFormat) => {
                let format = value.parse::<DataFormat>();
                self.set_data_format(id, format.unwrap_or_default());
                format.map(drop)
            }
            Target::Bus => match parse_switch(value) {
                Ok(true) => return self.enable_bus().await,
                Ok(false) => {
                    self.disable_bus().await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
        };
        if result.is_err() {
            warn!("{}: unknown value", attr.name());
        }
        result
    }
}
