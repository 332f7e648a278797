//! Driver identity constants
//!
//! Central naming used in log lines and by the buffer-exchange framework
//! when it lists registered interfaces. Reference these constants rather
//! than hardcoding the strings.

/// Interface name reported to the buffer-exchange framework
pub const DRIVER_NAME: &str = "i2s-engine";

/// Short description of the hardware interface
pub const DRIVER_DESCRIPTION: &str = "FPGA I2S streaming interface (8 channels, 2 ports)";

/// Driver version (synchronized with Cargo.toml)
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
