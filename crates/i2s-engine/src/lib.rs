//! Channel engine for the 8-channel memory-mapped I2S streaming core
//!
//! The core exposes eight fixed-capacity channels split across two ports
//! (four channels each). It has no DMA: data moves between caller-owned
//! buffers and the channel FIFOs word by word, in software. Master clocks
//! come from a separate clock generator IP that must report lock before
//! channels are configured.
//!
//! # Architecture
//!
//! ```text
//! producer ── enqueue ──► PendingQueue ─┐
//!                                        │
//! IRQ ── on_interrupt ── mark ready ──► Signal ──► run_deferred_worker
//!                                                      │
//!                         FIFO window ◄── copy words ──┘──► Mbo::complete
//! ```
//!
//! - [`clkgen`] - clock generator lock protocol
//! - [`port`] - port configuration store, byte-count encoding
//! - [`queue`] - bounded per-channel buffer FIFO
//! - [`channel`] - channel state machine: configure, enqueue, poison
//! - [`irq`] - interrupt fast path
//! - [`worker`] - deferred transfer worker
//! - [`control`] - typed and textual control surface, bus enable
//! - [`device`] - attach / detach, locking, [`platform::StreamInterface`]
//!
//! # Contexts
//!
//! A [`Device`] is shared by three contexts: producers (`enqueue`,
//! `poison`), the interrupt handler ([`Device::on_interrupt`]) and the
//! worker task ([`Device::run_deferred_worker`]). Place it in a `static`:
//!
//! ```ignore
//! static DEVICE: StaticCell<Device<Mmio, Mmio, Delay>> = StaticCell::new();
//!
//! let dev = DEVICE.init(Device::new(i2s, clkgen, Delay, I2S_IRQ));
//! spawner.spawn(worker(dev))?;            // loops in run_deferred_worker
//! dev.store(Attribute::PortAEnable, "1").await?;
//! dev.store(Attribute::BusEnable, "1").await?;
//! dev.configure(0, config).await?;
//! ```
//!
//! # Features
//!
//! - `defmt`: log through defmt, derive `defmt::Format`
//! - `tracing`: log through tracing (host builds)

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod fmt;

pub mod channel;
pub mod clkgen;
pub mod control;
pub mod device;
pub mod error;
pub mod irq;
pub mod port;
pub mod queue;
pub mod regs;
pub mod worker;

pub use channel::{ChannelIndex, ChannelState, ChannelStatus};
pub use clkgen::{ClockGenerator, ClockSource, MAX_LOCK_ATTEMPTS};
pub use control::Attribute;
pub use device::{
    Device, BUFFER_SIZE, CHANNELS_PER_PORT, FIFO_WIDTH, NUM_CHANNELS, NUM_PORTS, PREFILL_THRESHOLD,
};
pub use error::{Error, Invalid, Result};
pub use port::{byte_count_field, ClockMode, ClockSpeed, DataFormat, PortConfig, PortId};
pub use queue::{PendingQueue, MAX_BUFFERS};
pub use worker::ServiceReport;
