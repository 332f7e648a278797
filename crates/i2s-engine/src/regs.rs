//! Register map of the I2S streaming core and its clock generator.
//!
//! All offsets are 32-bit word offsets into the respective register window
//! (see [`platform::registers`]).
//!
//! ## I2S core
//!
//! | Offset | Name   | Description                                        |
//! |--------|--------|----------------------------------------------------|
//! | 0x00   | DCCRA  | Port A configuration + per-channel interrupt enable |
//! | 0x01   | DCCRB  | Port B configuration + per-channel interrupt enable |
//! | 0x02   | DSCR   | Global status, one bit per channel                  |
//!
//! Each channel `n` owns an 8-word block at `0x08 + n * 8`:
//!
//! | Offset | Name   | Description                          |
//! |--------|--------|--------------------------------------|
//! | +0x0   | CCR    | Control (direction, byte count, mask) |
//! | +0x1   | BFTR   | Buffer-full threshold (quadlets)      |
//! | +0x2   | BETR   | Buffer-empty threshold (quadlets)     |
//! | +0x3   | CBBAR  | Rx FIFO read window                   |
//! | +0x5   | NBBAR  | Tx FIFO write window                  |
//! | +0x6   | NBEAR  | Next buffer end address               |
//! | +0x7   | CSR    | Status, write-one-to-clear            |

// ─── Global registers ────────────────────────────────────────────────────────

/// Port A configuration register.
pub const DCCRA: usize = 0x00;
/// Port B configuration register.
pub const DCCRB: usize = 0x01;
/// Global status register (bit `n` = channel `n` has a pending event).
pub const DSCR: usize = 0x02;

// ─── Per-channel registers ───────────────────────────────────────────────────

/// Word distance between two channels' register blocks.
pub const CHANNEL_STRIDE: usize = 0x08;

/// Channel control register.
pub const CCR: usize = 0x08;
/// Buffer-full threshold register.
pub const BFTR: usize = 0x09;
/// Buffer-empty threshold register.
pub const BETR: usize = 0x0A;
/// Receive FIFO read window (current buffer base address register).
pub const CBBAR: usize = 0x0B;
/// Transmit FIFO write window (next buffer base address register).
pub const NBBAR: usize = 0x0D;
/// Next buffer end address register.
pub const NBEAR: usize = 0x0E;
/// Channel status register.
pub const CSR: usize = 0x0F;

/// Word offset of `register` for channel `channel`.
pub const fn channel_reg(channel: usize, register: usize) -> usize {
    channel
        .saturating_mul(CHANNEL_STRIDE)
        .saturating_add(register)
}

// ─── Port configuration bits (DCCRA / DCCRB) ────────────────────────────────

/// Port reset.
pub const PORT_RST: u32 = 0x0001_0000;
/// Port enable.
pub const PORT_EN: u32 = 0x0002_0000;
/// Register-IO (software FIFO) mode.
pub const IO_MODE: u32 = 0x0000_0200;
/// DMA mode. Not used: the core is driven without DMA.
pub const DMA_MODE: u32 = 0x0000_0100;

// ─── Channel control bits (CCR) ─────────────────────────────────────────────

/// Hold the channel in reset.
pub const CHANNEL_RESET: u32 = 0x0100_0000;
/// Channel enable.
pub const CHANNEL_EN: u32 = 0x0080_0000;
/// Transmit direction (memory → FIFO).
pub const CHANNEL_TX: u32 = 0x0040_0000;

/// AND-mask re-arming the Tx service interrupt.
pub const TX_INT_MASK: u32 = 0xFFFF_FFD7;
/// AND-mask re-arming the Rx service interrupt.
pub const RX_INT_MASK: u32 = 0xFFFF_FFE7;
/// OR-bit holding off the Tx service interrupt.
pub const TX_INT_UNMASK: u32 = 0x0000_0020;
/// OR-bit holding off the Rx service interrupt.
pub const RX_INT_UNMASK: u32 = 0x0000_0010;
/// Every interrupt held off.
pub const UNMASK_ALL: u32 = 0x0000_00FF;

// ─── Channel status bits (CSR) ──────────────────────────────────────────────

/// Rx FIFO has data to read.
pub const RX_SERV_REQ: u32 = 0x0000_0002;
/// Tx FIFO has room to write.
pub const TX_SERV_REQ: u32 = 0x0000_0004;
/// Rx FIFO overflowed.
pub const FIFO_OVERFLOW: u32 = 0x0000_0008;
/// Tx FIFO underflowed.
pub const FIFO_UNDERFLOW: u32 = 0x0000_0010;
/// Every status bit.
pub const CLEAR_ALL: u32 = 0x0000_00FF;

// ─── Thresholds ─────────────────────────────────────────────────────────────

/// FIFO threshold written to BFTR/BETR, in quadlets.
pub const QUADLETS_THRESHOLD: u32 = 496;

// ─── Clock generator ────────────────────────────────────────────────────────

/// Clock generator configuration register (source select, reset, lock status).
pub const CLKGEN_CFG: usize = 0x00;
/// Clock generator divider register.
pub const CLKGEN_DIV: usize = 0x01;

/// Divider value: input clock passed through undivided.
pub const CLKGEN_DIV_NONE: u32 = 0x0000_0000;
/// MMCM reset.
pub const MMCM_RESET: u32 = 0x2000_0000;
/// MMCM locked (read-only status).
pub const MMCM_LOCKED: u32 = 0x4000_0000;
/// Clock source select field.
pub const CLK_SEL_MASK: u32 = 0x1C00_0000;
