//! Bus slave implementations.
//!
//! This module contains the slaves the SoC builder places behind decode windows:
//! on-chip memory (SRAM and boot ROM), the debug support unit, the plug-and-play
//! registry and the "none" placeholder used for disabled or unattached slots.

/// Debug support unit.
pub mod dsu;

/// Placeholder slave for disabled windows and empty peripheral slots.
pub mod none;

/// Plug-and-play descriptor registry.
pub mod pnp;

/// SRAM and ROM memory slaves.
pub mod sram;

pub use dsu::{DebugView, DebugWrite, Dsu};
pub use none::NoneSlave;
pub use pnp::{PnpEntry, PnpKind, PnpRegistry, PnpTable};
pub use sram::Sram;

pub use crate::soc::traits::Slave;
