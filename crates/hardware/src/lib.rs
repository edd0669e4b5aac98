//! RISC-V SoC memory bus model.
//!
//! This crate implements a lock-step model of a shared 64-bit memory bus with the following:
//! 1. **Interconnect:** Address decoder, fixed-priority arbiter, utilization counters and a
//!    latched miss report for unmapped accesses.
//! 2. **Memory access adapter:** Width adaptation between byte/half/word/double CPU accesses
//!    and doubleword-aligned, byte-masked bus transactions.
//! 3. **Debug support unit:** A bus slave exposing registers, CSRs, run control, soft reset
//!    and arbiter diagnostics to an external host.
//! 4. **Plug-and-play registry:** A read-only descriptor block generated from the same bus
//!    map as the decoder.
//! 5. **Simulation:** Configuration, a replay core, the run loop and statistics.

/// Common types and constants (bus geometry, DSU layout, errors).
pub mod common;
/// Bus configuration (defaults, master/slave tables, adapter and DSU settings).
pub mod config;
/// CPU side: request protocol, memory access adapter, register files, replay core.
pub mod core;
/// Run loop and image loading.
pub mod sim;
/// System-on-chip (map, decoder, arbiter, slaves, builder).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Core trait driven by the SoC every tick.
pub use crate::core::Core;
/// Top-level system (arbiter, slaves, adapters, core); construct with `Soc::new`.
pub use crate::soc::Soc;
