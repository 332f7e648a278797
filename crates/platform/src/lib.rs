//! Hardware abstraction for the I2S streaming engine
//!
//! This crate provides the trait seams the engine is written against,
//! enabling development and testing without the FPGA.
//!
//! # Architecture Layers
//!
//! ```text
//! Buffer-exchange framework (producers / consumers)
//!         ↓
//! Channel engine (i2s-engine crate)
//!         ↓
//! Platform HAL (this crate - register bus + stream contract)
//!         ↓
//! Memory-mapped IP blocks (I2S core, clock generator)
//! ```
//!
//! # Modules
//!
//! - [`registers`] - 32-bit register window trait and volatile MMIO accessor
//! - [`stream`] - buffer objects and the [`StreamInterface`] contract
//! - [`config`] - driver identity constants
//! - `mocks` - scriptable registers, counting delay, recording completion
//!   (`std` feature or tests)
//!
//! # Features
//!
//! - `std`: Enable standard library support and the mocks (for testing)
//! - `defmt`: Derive `defmt::Format` on public types

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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod config;
pub mod mocks;
pub mod registers;
pub mod stream;

pub use registers::{Mmio, RegisterBus};
pub use stream::{
    ChannelCapability, ChannelConfig, DataType, Direction, DirectionMask, Mbo, MboCompletion,
    MboStatus, Rejected, StreamInterface,
};
