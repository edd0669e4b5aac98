//! Debug Support Unit (DSU).
//!
//! A bus slave giving an external host a non-intrusive view of the core and the bus. The
//! host uses ordinary bus transactions; there is no separate wire protocol.
//!
//! # Register map
//!
//! All registers are doublewords. Offsets are relative to the DSU window.
//!
//! * `0x0_0000 + id * 8`: CSR `id`, for ids in the configured CSR table (others read 0).
//! * `0x0_8000 + n * 8`: general register `x[n]`, `n < 32`; `0x0_8100` is the PC.
//! * `0x1_0000`: run control. Bit 0 halts the core.
//! * `0x1_0008`: step budget. While halted, the core advances this many ticks, then stops.
//! * `0x1_0010`: clock counter (ticks since full reset, read-only).
//! * `0x1_0018`: step counter reported by the core (read-only).
//! * `0x1_8000`: soft reset strobe. Writing bit 0 resets the CPU/bus domain; self-clearing.
//! * `0x1_8008`: arbiter miss flag (read-only mirror).
//! * `0x1_8010`: arbiter miss address (read-only mirror).
//! * `0x1_8040 + m * 16`: write-utilization ticks of master `m` (read-only mirror).
//! * `0x1_8048 + m * 16`: read-utilization ticks of master `m` (read-only mirror).
//!
//! Undefined offsets read as zero and ignore writes.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::common::constants::{
    DSU_CONTROL_BASE, DSU_CSR_BASE, DSU_GPR_BASE, DSU_LOCAL_BASE, DSU_REG_STRIDE,
    DSU_REGION_SIZE, GPR_COUNT,
};
use crate::config::CsrEntry;
use crate::core::Core;
use crate::soc::devices::Slave;
use crate::soc::interconnect::BusDiagnostics;
use crate::soc::transaction::{SlaveRequest, SlaveResponse};

/// Register index of the PC inside the general register region.
pub const DSU_PC_INDEX: u64 = GPR_COUNT as u64;

/// Control region: halt bit register.
pub const DSU_CONTROL: u64 = DSU_CONTROL_BASE;
/// Control region: step budget register.
pub const DSU_STEP_BUDGET: u64 = DSU_CONTROL_BASE + 0x08;
/// Control region: clock counter.
pub const DSU_CLOCK_COUNT: u64 = DSU_CONTROL_BASE + 0x10;
/// Control region: core step counter.
pub const DSU_STEP_COUNT: u64 = DSU_CONTROL_BASE + 0x18;

/// Local region: soft reset strobe.
pub const DSU_SOFT_RESET: u64 = DSU_LOCAL_BASE;
/// Local region: miss flag mirror.
pub const DSU_MISS_FLAG: u64 = DSU_LOCAL_BASE + 0x08;
/// Local region: miss address mirror.
pub const DSU_MISS_ADDR: u64 = DSU_LOCAL_BASE + 0x10;
/// Local region: first utilization counter pair.
pub const DSU_UTIL_BASE: u64 = DSU_LOCAL_BASE + 0x40;
/// Distance between the counter pairs of two masters.
pub const DSU_UTIL_STRIDE: u64 = 0x10;

const CONTROL_HALT: u64 = 1 << 0;

/// Offset of CSR `id` in the DSU window.
pub const fn csr_offset(id: u16) -> u64 {
    DSU_CSR_BASE + id as u64 * DSU_REG_STRIDE
}

/// Offset of general register `x[n]` in the DSU window.
pub const fn gpr_offset(n: usize) -> u64 {
    DSU_GPR_BASE + n as u64 * DSU_REG_STRIDE
}

/// Offset of master `m`'s write-utilization counter; the read counter follows at `+ 8`.
pub const fn util_offset(m: usize) -> u64 {
    DSU_UTIL_BASE + m as u64 * DSU_UTIL_STRIDE
}

/// A host write that must be applied to the core after the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugWrite {
    /// Write general register `index` (never 0).
    Gpr {
        /// Register number.
        index: usize,
        /// New value.
        value: u64,
    },
    /// Write a CSR from the configured table.
    Csr {
        /// CSR id.
        id: u16,
        /// New value.
        value: u64,
    },
    /// Redirect the program counter.
    Pc(u64),
}

/// Snapshot of core and bus state served to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugView {
    /// General register file.
    pub gpr: [u64; GPR_COUNT],
    /// Program counter.
    pub pc: u64,
    /// CSR values, parallel to the configured CSR table.
    pub csrs: Vec<u64>,
    /// Steps reported by the core.
    pub steps: u64,
    /// Arbiter diagnostics mirror.
    pub bus: BusDiagnostics,
}

impl DebugView {
    fn empty(csrs: usize, masters: usize) -> Self {
        Self {
            gpr: [0; GPR_COUNT],
            pc: 0,
            csrs: vec![0; csrs],
            steps: 0,
            bus: BusDiagnostics::new(masters),
        }
    }
}

/// Debug support unit slave.
#[derive(Debug)]
pub struct Dsu {
    name: String,
    table: Vec<CsrEntry>,
    index: HashMap<u16, usize>,
    view: DebugView,
    halt: bool,
    step_budget: u64,
    clock_count: u64,
    soft_reset: bool,
    pending: Vec<DebugWrite>,
}

impl Dsu {
    /// Creates a DSU exposing `table` and mirroring `masters` utilization counter pairs.
    pub fn new(name: &str, table: &[CsrEntry], masters: usize) -> Self {
        let index = table.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        Self {
            name: name.to_string(),
            table: table.to_vec(),
            index,
            view: DebugView::empty(table.len(), masters),
            halt: false,
            step_budget: 0,
            clock_count: 0,
            soft_reset: false,
            pending: Vec::new(),
        }
    }

    /// Refreshes the register view from the core and the arbiter (one debug poll).
    pub fn refresh(&mut self, core: &dyn Core, bus: &BusDiagnostics) {
        for (n, slot) in self.view.gpr.iter_mut().enumerate() {
            *slot = core.read_gpr(n);
        }
        self.view.pc = core.pc();
        for (slot, entry) in self.view.csrs.iter_mut().zip(&self.table) {
            *slot = core.read_csr(entry.id).unwrap_or(0);
        }
        self.view.steps = core.steps();
        self.view.bus.clone_from(bus);
    }

    /// The current register view.
    pub const fn view(&self) -> &DebugView {
        &self.view
    }

    /// The configured CSR table.
    pub fn csr_table(&self) -> &[CsrEntry] {
        &self.table
    }

    /// Returns `true` while the host holds the core halted.
    pub const fn is_halted(&self) -> bool {
        self.halt
    }

    /// Ticks counted since the last full reset.
    pub const fn clock_count(&self) -> u64 {
        self.clock_count
    }

    /// Decides whether the core may advance this tick, consuming one budgeted step if halted.
    pub fn core_enabled(&mut self) -> bool {
        if !self.halt {
            return true;
        }
        if self.step_budget > 0 {
            self.step_budget -= 1;
            return true;
        }
        false
    }

    /// Returns and clears the soft reset strobe.
    pub fn take_soft_reset(&mut self) -> bool {
        std::mem::take(&mut self.soft_reset)
    }

    /// Returns the host writes queued since the last call.
    pub fn take_writes(&mut self) -> Vec<DebugWrite> {
        std::mem::take(&mut self.pending)
    }

    /// Reads the register at a doubleword-aligned window offset.
    pub fn read_reg(&self, offset: u64) -> u64 {
        match region(offset) {
            Region::Csr(id) => self
                .index
                .get(&id)
                .and_then(|&i| self.view.csrs.get(i))
                .copied()
                .unwrap_or(0),
            Region::Gpr(n) if n < GPR_COUNT as u64 => self.view.gpr[n as usize],
            Region::Gpr(DSU_PC_INDEX) => self.view.pc,
            Region::Gpr(_) => 0,
            Region::Control(reg) => match reg {
                DSU_CONTROL => u64::from(self.halt) * CONTROL_HALT,
                DSU_STEP_BUDGET => self.step_budget,
                DSU_CLOCK_COUNT => self.clock_count,
                DSU_STEP_COUNT => self.view.steps,
                _ => 0,
            },
            Region::Local(reg) => self.read_local(reg),
        }
    }

    fn read_local(&self, reg: u64) -> u64 {
        let bus = &self.view.bus;
        match reg {
            DSU_SOFT_RESET => u64::from(self.soft_reset),
            DSU_MISS_FLAG => u64::from(bus.miss),
            DSU_MISS_ADDR => bus.miss_addr,
            r if r >= DSU_UTIL_BASE => {
                let rel = r - DSU_UTIL_BASE;
                let master = usize::try_from(rel / DSU_UTIL_STRIDE).unwrap_or(usize::MAX);
                bus.utilization.get(master).map_or(0, |u| {
                    if rel % DSU_UTIL_STRIDE == 0 {
                        u.write_ticks
                    } else {
                        u.read_ticks
                    }
                })
            }
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u64, value: u64) {
        match region(offset) {
            Region::Csr(id) => {
                if self.index.contains_key(&id) {
                    self.pending.push(DebugWrite::Csr { id, value });
                }
            }
            Region::Gpr(n) if n > 0 && n < GPR_COUNT as u64 => {
                self.pending.push(DebugWrite::Gpr {
                    index: n as usize,
                    value,
                });
            }
            Region::Gpr(DSU_PC_INDEX) => self.pending.push(DebugWrite::Pc(value)),
            Region::Gpr(_) => {}
            Region::Control(DSU_CONTROL) => {
                self.halt = value & CONTROL_HALT != 0;
                debug!(halt = self.halt, "dsu run control");
            }
            Region::Control(DSU_STEP_BUDGET) => self.step_budget = value,
            Region::Control(_) => {}
            Region::Local(DSU_SOFT_RESET) => {
                if value & 1 != 0 {
                    info!("dsu soft reset requested");
                    self.soft_reset = true;
                }
            }
            Region::Local(_) => {}
        }
    }
}

/// Decoded DSU region. Control and local registers keep their absolute offset.
enum Region {
    Csr(u16),
    Gpr(u64),
    Control(u64),
    Local(u64),
}

const fn region(offset: u64) -> Region {
    match offset / DSU_REGION_SIZE {
        0 => Region::Csr(((offset - DSU_CSR_BASE) / DSU_REG_STRIDE) as u16),
        1 => Region::Gpr((offset - DSU_GPR_BASE) / DSU_REG_STRIDE),
        2 => Region::Control(offset),
        3 => Region::Local(offset),
        _ => Region::Local(u64::MAX),
    }
}

impl Slave for Dsu {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, req: &SlaveRequest) -> SlaveResponse {
        if req.is_write() {
            let value = req.byte_mask.merge(self.read_reg(req.offset), req.data);
            debug!(offset = req.offset, value, "dsu host write");
            self.write_reg(req.offset, value);
            SlaveResponse::ok(0)
        } else {
            SlaveResponse::ok(self.read_reg(req.offset))
        }
    }

    fn tick(&mut self) {
        self.clock_count += 1;
    }

    /// The DSU lives outside the soft-reset domain.
    fn soft_reset(&mut self) {}

    fn reset(&mut self) {
        self.view = DebugView::empty(self.table.len(), self.view.bus.utilization.len());
        self.halt = false;
        self.step_budget = 0;
        self.clock_count = 0;
        self.soft_reset = false;
        self.pending.clear();
    }

    fn as_dsu_mut(&mut self) -> Option<&mut Dsu> {
        Some(self)
    }
}
