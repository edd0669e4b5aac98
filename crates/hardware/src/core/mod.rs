//! CPU side of the bus.
//!
//! This module defines the fixed request/response protocol between a core and its memory
//! access adapters, and the `Core` trait the SoC drives every tick. It contains:
//! 1. **Protocol:** `CpuRequest` and `CpuResponse`, one pair per channel (instruction and data).
//! 2. **Adapter:** The memory access adapter turning CPU accesses into bus transactions.
//! 3. **Architecture state:** General-purpose and control/status register files.
//! 4. **Replay core:** A reference core that replays a memory-operation trace.
//!
//! Instruction semantics are not modelled here; any decode/execute engine that speaks the
//! protocol can be plugged in through `Core`.

/// Memory access adapter (CPU access to bus transaction and back).
pub mod adapter;

/// Architectural register files (GPR, CSR).
pub mod arch;

/// Trace-driven reference core.
pub mod replay;

pub use self::adapter::{Issue, MemoryAccessAdapter};
pub use self::replay::ReplayCore;

use crate::soc::transaction::{AccessWidth, Direction};

/// One CPU access as produced by the pipeline, before width adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuRequest {
    /// Byte address of the access.
    pub addr: u64,
    /// Width class.
    pub width: AccessWidth,
    /// Load or store.
    pub direction: Direction,
    /// Store data, right-aligned in the register.
    pub data: u64,
}

impl CpuRequest {
    /// A load of `width` at `addr`.
    pub const fn read(addr: u64, width: AccessWidth) -> Self {
        Self {
            addr,
            width,
            direction: Direction::Read,
            data: 0,
        }
    }

    /// A store of the low `width` bytes of `data` at `addr`.
    pub const fn write(addr: u64, width: AccessWidth, data: u64) -> Self {
        Self {
            addr,
            width,
            direction: Direction::Write,
            data,
        }
    }
}

/// Answer to a `CpuRequest`, delivered by the adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuResponse {
    /// The slave accepted the access.
    pub valid: bool,
    /// Original (unaligned) address of the request.
    pub addr: u64,
    /// Load data shifted down to bit 0 and truncated to the width; no sign extension.
    pub data: u64,
    /// No response arrived within the adapter timeout.
    pub timed_out: bool,
}

/// Per-channel inputs of one core tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelInputs {
    /// Response completed by the adapter on the previous tick.
    pub response: Option<CpuResponse>,
    /// The adapter will accept a request this tick.
    pub ready: bool,
    /// Outcome of the request driven on the previous tick, if any.
    pub issue: Option<Issue>,
}

/// Everything a core samples at the start of a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreInputs {
    /// Instruction-fetch channel.
    pub instr: ChannelInputs,
    /// Data channel.
    pub data: ChannelInputs,
    /// External interrupt line (OR of the slave interrupt lines).
    pub ext_irq: bool,
    /// `false` while the debug support unit holds the core halted. A halted core must not
    /// issue requests or retire work, but still receives responses.
    pub enabled: bool,
}

/// Requests a core drives for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreOutputs {
    /// Instruction-fetch request.
    pub instr: Option<CpuRequest>,
    /// Data request.
    pub data: Option<CpuRequest>,
}

/// A CPU core driven in lock-step by the SoC.
///
/// The SoC calls `tick` once per cycle. Register accessors feed the debug support unit;
/// the write accessors apply host writes and have no effect by default.
pub trait Core: Send {
    /// Advances the core by one tick.
    fn tick(&mut self, inputs: &CoreInputs) -> CoreOutputs;

    /// Returns the core to its reset state (soft-reset domain).
    fn reset(&mut self);

    /// Reads general register `x[idx]`.
    fn read_gpr(&self, idx: usize) -> u64;

    /// Current program counter.
    fn pc(&self) -> u64;

    /// Reads a CSR, or `None` when the core does not implement it.
    fn read_csr(&self, id: u16) -> Option<u64>;

    /// Work items retired since reset.
    fn steps(&self) -> u64;

    /// Writes general register `x[idx]`.
    fn write_gpr(&mut self, _idx: usize, _val: u64) {}

    /// Writes a CSR.
    fn write_csr(&mut self, _id: u16, _val: u64) {}

    /// Redirects the program counter.
    fn set_pc(&mut self, _pc: u64) {}

    /// Returns `true` once the core has nothing left to do.
    fn finished(&self) -> bool {
        false
    }
}
