//! RISC-V architectural state visible to the debug support unit.
//!
//! This module contains the register files a core exposes through the debug window:
//! 1. **CSRs:** The machine-level control and status registers named in the debug table.
//! 2. **GPRs:** The integer register file with `x0` hardwired to zero.

/// Control and Status Register definitions and storage.
pub mod csr;

/// General-Purpose Register file implementation.
pub mod gpr;
