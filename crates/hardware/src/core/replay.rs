//! Trace-driven reference core.
//!
//! `ReplayCore` speaks the CPU side of the bus protocol without decoding instructions. It
//! replays two independent streams from a JSON trace:
//! 1. **Fetch stream:** Word reads on the instruction channel; each completed fetch moves
//!    the PC and retires one step.
//! 2. **Data stream:** Loads (written to a destination register), stores and idle gaps on
//!    the data channel.
//!
//! Failed or timed-out accesses are recorded as access faults in `mcause`/`mbadaddr`/`mepc`
//! and the stream moves on, so a trace always terminates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::error::ConfigError;
use crate::core::adapter::Issue;
use crate::core::arch::csr::{
    self, CAUSE_INSTR_ACCESS_FAULT, CAUSE_INSTR_ADDR_MISALIGNED, CAUSE_LOAD_ACCESS_FAULT,
    CAUSE_LOAD_ADDR_MISALIGNED, CAUSE_STORE_ACCESS_FAULT, CAUSE_STORE_ADDR_MISALIGNED, Csrs,
};
use crate::core::arch::gpr::Gpr;
use crate::core::{ChannelInputs, Core, CoreInputs, CoreOutputs, CpuRequest, CpuResponse};
use crate::soc::transaction::{AccessWidth, Direction};

/// One operation of the data stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ReplayOp {
    /// Read `width` bytes at `addr` into `x[rd]` (zero-extended).
    Load {
        /// Byte address.
        addr: u64,
        /// Access width.
        width: AccessWidth,
        /// Destination register.
        rd: usize,
    },
    /// Write the low `width` bytes of `value` at `addr`.
    Store {
        /// Byte address.
        addr: u64,
        /// Access width.
        width: AccessWidth,
        /// Value to store.
        value: u64,
    },
    /// Leave the data channel idle for `ticks` ticks.
    Idle {
        /// Idle duration.
        ticks: u64,
    },
}

impl ReplayOp {
    const fn request(&self) -> Option<CpuRequest> {
        match *self {
            Self::Load { addr, width, .. } => Some(CpuRequest::read(addr, width)),
            Self::Store { addr, width, value } => Some(CpuRequest::write(addr, width, value)),
            Self::Idle { .. } => None,
        }
    }
}

/// A replay trace as stored on disk.
///
/// ```
/// use rvsoc_core::core::replay::ReplayTrace;
///
/// let trace = ReplayTrace::from_json(
///     r#"{ "fetch": [0, 4], "data": [{ "op": "store", "addr": 268435459, "width": "byte", "value": 171 }] }"#,
/// )
/// .unwrap();
/// assert_eq!(trace.fetch.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplayTrace {
    /// PC after reset.
    #[serde(default)]
    pub reset_pc: u64,
    /// Instruction fetch addresses, in order.
    #[serde(default)]
    pub fetch: Vec<u64>,
    /// Data-channel operations, in order.
    #[serde(default)]
    pub data: Vec<ReplayOp>,
}

impl ReplayTrace {
    /// Parses a trace from JSON.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` on malformed JSON or an unknown operation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a trace file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` when the file cannot be read, `ConfigError::Parse` when it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Progress of one replay stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Stream {
    next: usize,
    in_flight: bool,
}

/// Core that replays a memory-operation trace.
#[derive(Clone, Debug)]
pub struct ReplayCore {
    trace: ReplayTrace,
    hart_id: u64,
    gpr: Gpr,
    csrs: Csrs,
    pc: u64,
    steps: u64,
    fetch: Stream,
    data: Stream,
    idle: u64,
    last_instr: u64,
}

impl ReplayCore {
    /// Creates a core replaying `trace` as hart `hart_id`.
    pub fn new(trace: ReplayTrace, hart_id: u64) -> Self {
        let pc = trace.reset_pc;
        Self {
            trace,
            hart_id,
            gpr: Gpr::new(),
            csrs: Csrs::new(hart_id),
            pc,
            steps: 0,
            fetch: Stream::default(),
            data: Stream::default(),
            idle: 0,
            last_instr: 0,
        }
    }

    /// A core with nothing to replay; it only keeps its registers and the clock.
    pub fn idle() -> Self {
        Self::new(ReplayTrace::default(), 0)
    }

    /// Word returned by the most recent fetch.
    pub const fn last_instr(&self) -> u64 {
        self.last_instr
    }

    /// The register file.
    pub const fn gpr(&self) -> &Gpr {
        &self.gpr
    }

    /// The CSR file.
    pub const fn csrs(&self) -> &Csrs {
        &self.csrs
    }

    fn retire_fetch(&mut self, resp: &CpuResponse) {
        self.fetch.in_flight = false;
        self.fetch.next += 1;
        if resp.valid && !resp.timed_out {
            self.pc = resp.addr;
            self.last_instr = resp.data;
            self.steps += 1;
        } else {
            debug!(addr = resp.addr, "instruction access fault");
            self.csrs
                .record_fault(CAUSE_INSTR_ACCESS_FAULT, resp.addr, self.pc);
        }
    }

    fn retire_data(&mut self, resp: &CpuResponse) {
        self.data.in_flight = false;
        let Some(op) = self.trace.data.get(self.data.next).copied() else {
            return;
        };
        self.data.next += 1;
        let ok = resp.valid && !resp.timed_out;
        match op {
            ReplayOp::Load { rd, .. } if ok => self.gpr.write(rd, resp.data),
            ReplayOp::Load { .. } => {
                debug!(addr = resp.addr, "load access fault");
                self.csrs
                    .record_fault(CAUSE_LOAD_ACCESS_FAULT, resp.addr, self.pc);
            }
            ReplayOp::Store { .. } if !ok => {
                debug!(addr = resp.addr, "store access fault");
                self.csrs
                    .record_fault(CAUSE_STORE_ACCESS_FAULT, resp.addr, self.pc);
            }
            ReplayOp::Store { .. } | ReplayOp::Idle { .. } => {}
        }
    }

    /// Handles the adapter's verdict on the request driven last tick.
    fn settle(stream: &mut Stream, channel: &ChannelInputs) -> bool {
        match channel.issue {
            Some(Issue::Busy) => {
                stream.in_flight = false;
                false
            }
            Some(Issue::Misaligned) => {
                stream.in_flight = false;
                stream.next += 1;
                true
            }
            Some(Issue::Accepted) | None => false,
        }
    }
}

impl Core for ReplayCore {
    fn tick(&mut self, inputs: &CoreInputs) -> CoreOutputs {
        self.csrs.mtime = self.csrs.mtime.wrapping_add(1);
        if inputs.ext_irq {
            self.csrs.mip |= csr::MIP_MEIP;
        } else {
            self.csrs.mip &= !csr::MIP_MEIP;
        }

        if Self::settle(&mut self.fetch, &inputs.instr) {
            let addr = self.trace.fetch.get(self.fetch.next - 1).copied().unwrap_or(0);
            self.csrs
                .record_fault(CAUSE_INSTR_ADDR_MISALIGNED, addr, self.pc);
        }
        if Self::settle(&mut self.data, &inputs.data) {
            if let Some(req) = self
                .trace
                .data
                .get(self.data.next - 1)
                .and_then(ReplayOp::request)
            {
                let cause = match req.direction {
                    Direction::Read => CAUSE_LOAD_ADDR_MISALIGNED,
                    Direction::Write => CAUSE_STORE_ADDR_MISALIGNED,
                };
                self.csrs.record_fault(cause, req.addr, self.pc);
            }
        }
        if let Some(resp) = inputs.instr.response {
            self.retire_fetch(&resp);
        }
        if let Some(resp) = inputs.data.response {
            self.retire_data(&resp);
        }

        let mut out = CoreOutputs::default();
        if !inputs.enabled {
            return out;
        }

        if !self.fetch.in_flight && inputs.instr.ready {
            if let Some(&addr) = self.trace.fetch.get(self.fetch.next) {
                out.instr = Some(CpuRequest::read(addr, AccessWidth::Word));
                self.fetch.in_flight = true;
            }
        }

        if self.idle > 0 {
            self.idle -= 1;
        } else if !self.data.in_flight && inputs.data.ready {
            match self.trace.data.get(self.data.next).copied() {
                Some(ReplayOp::Idle { ticks }) => {
                    self.idle = ticks;
                    self.data.next += 1;
                }
                Some(op) => {
                    out.data = op.request();
                    self.data.in_flight = true;
                }
                None => {}
            }
        }
        out
    }

    fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.trace), self.hart_id);
    }

    fn read_gpr(&self, idx: usize) -> u64 {
        self.gpr.read(idx)
    }

    fn pc(&self) -> u64 {
        self.pc
    }

    fn read_csr(&self, id: u16) -> Option<u64> {
        self.csrs.read(id)
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn write_gpr(&mut self, idx: usize, val: u64) {
        self.gpr.write(idx, val);
    }

    fn write_csr(&mut self, id: u16, val: u64) {
        self.csrs.write(id, val);
    }

    fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    fn finished(&self) -> bool {
        self.fetch.next >= self.trace.fetch.len()
            && self.data.next >= self.trace.data.len()
            && !self.fetch.in_flight
            && !self.data.in_flight
            && self.idle == 0
    }
}
