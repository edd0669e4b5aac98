//! Slave trait for bus-attached components.
//!
//! This module defines the `Slave` trait implemented by everything behind a decode window. It provides:
//! 1. **Identification:** `name` for logs and lookups.
//! 2. **Access:** One `access` call per granted transaction, window-relative, answering `{valid, data}`.
//! 3. **Lifecycle:** Optional `tick`, soft reset, full reset and an interrupt line.
//! 4. **Downcasting:** Optional casts to `Dsu` or `Sram` for SoC-level plumbing.
//!
//! All implementors must be `Send + Sync` so a whole SoC can be moved to a worker thread.

use crate::soc::devices::{Dsu, Sram};
use crate::soc::transaction::{SlaveRequest, SlaveResponse};

/// Trait for components answering bus transactions inside an address window.
///
/// The arbiter calls `access` exactly once per granted transaction. A slave that cannot
/// service a request still answers; `SlaveResponse::NONE` is the "no validity, no side
/// effect" answer.
pub trait Slave: Send + Sync {
    /// Returns a short name for this slave (e.g. `"sram"`, `"dsu"`).
    fn name(&self) -> &str;

    /// Services one transaction at a doubleword-aligned, window-relative offset.
    fn access(&mut self, req: &SlaveRequest) -> SlaveResponse;

    /// Advances slave-internal state by one tick.
    fn tick(&mut self) {}

    /// Clears state belonging to the soft-reset domain.
    fn soft_reset(&mut self) {}

    /// Returns the slave to its power-on state.
    fn reset(&mut self) {
        self.soft_reset();
    }

    /// Level of this slave's interrupt line.
    fn irq(&self) -> bool {
        false
    }

    /// Returns a mutable reference as `Dsu` if this slave is the debug support unit.
    fn as_dsu_mut(&mut self) -> Option<&mut Dsu> {
        None
    }

    /// Returns a mutable reference as `Sram` if this slave is backed by memory.
    fn as_sram_mut(&mut self) -> Option<&mut Sram> {
        None
    }
}
