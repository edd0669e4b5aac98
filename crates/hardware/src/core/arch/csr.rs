//! Control and Status Register (CSR) definitions and storage.
//!
//! This module implements the machine-level CSR subset a core exposes to the debug support
//! unit. It provides:
//! 1. **Address Definitions:** Ids for identification, trap and timer CSRs.
//! 2. **Register Storage:** The `Csrs` struct holding architectural state.
//! 3. **Access Logic:** Reads and writes by id; unknown ids are reported as absent.
//!
//! Ids follow the privileged architecture numbering the debug tooling uses, where `misa`
//! lives at `0xF10` and wall-clock time at `0x701`.

/// Machine ISA register CSR address.
pub const MISA: u16 = 0xF10;

/// Machine vendor ID CSR address.
pub const MVENDORID: u16 = 0xF11;

/// Machine architecture ID CSR address.
pub const MARCHID: u16 = 0xF12;

/// Machine implementation ID CSR address.
pub const MIMPID: u16 = 0xF13;

/// Machine hardware thread ID CSR address.
pub const MHARTID: u16 = 0xF14;

/// Machine status register CSR address.
pub const MSTATUS: u16 = 0x300;

/// Machine interrupt enable register CSR address.
pub const MIE: u16 = 0x304;

/// Machine trap vector base address register CSR address.
pub const MTVEC: u16 = 0x305;

/// Machine scratch register CSR address.
pub const MSCRATCH: u16 = 0x340;

/// Machine exception program counter CSR address.
pub const MEPC: u16 = 0x341;

/// Machine cause register CSR address.
pub const MCAUSE: u16 = 0x342;

/// Machine bad address register CSR address.
pub const MBADADDR: u16 = 0x343;

/// Machine interrupt pending register CSR address.
pub const MIP: u16 = 0x344;

/// Machine wall-clock time CSR address.
pub const MTIME: u16 = 0x701;

/// Machine external interrupt pending bit in `mip`.
pub const MIP_MEIP: u64 = 1 << 11;

/// Instruction address misaligned cause.
pub const CAUSE_INSTR_ADDR_MISALIGNED: u64 = 0;

/// Instruction access fault cause.
pub const CAUSE_INSTR_ACCESS_FAULT: u64 = 1;

/// Load address misaligned cause.
pub const CAUSE_LOAD_ADDR_MISALIGNED: u64 = 4;

/// Load access fault cause.
pub const CAUSE_LOAD_ACCESS_FAULT: u64 = 5;

/// Store address misaligned cause.
pub const CAUSE_STORE_ADDR_MISALIGNED: u64 = 6;

/// Store access fault cause.
pub const CAUSE_STORE_ACCESS_FAULT: u64 = 7;

/// Default `misa` value for RV64IMAFDC architecture.
pub const MISA_DEFAULT_RV64IMAFDC: u64 = 0x8000_0000_0014_1101;

/// Default `mstatus` value for RV64 architecture.
pub const MSTATUS_DEFAULT_RV64: u64 = 0xa_0000_0000;

/// Control and Status Register file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Csrs {
    /// Machine ISA register.
    pub misa: u64,
    /// Machine vendor id (read-only).
    pub mvendorid: u64,
    /// Machine architecture id (read-only).
    pub marchid: u64,
    /// Machine implementation id (read-only).
    pub mimpid: u64,
    /// Hart id (read-only).
    pub mhartid: u64,
    /// Machine status register.
    pub mstatus: u64,
    /// Machine interrupt enable.
    pub mie: u64,
    /// Machine trap vector base address.
    pub mtvec: u64,
    /// Machine scratch register.
    pub mscratch: u64,
    /// Machine exception program counter.
    pub mepc: u64,
    /// Machine trap cause.
    pub mcause: u64,
    /// Faulting address of the last access fault.
    pub mbadaddr: u64,
    /// Machine interrupt pending.
    pub mip: u64,
    /// Wall-clock time in ticks.
    pub mtime: u64,
}

impl Csrs {
    /// Creates a CSR file in its reset state.
    pub const fn new(hart_id: u64) -> Self {
        Self {
            misa: MISA_DEFAULT_RV64IMAFDC,
            mvendorid: 0,
            marchid: 0,
            mimpid: 0,
            mhartid: hart_id,
            mstatus: MSTATUS_DEFAULT_RV64,
            mie: 0,
            mtvec: 0,
            mscratch: 0,
            mepc: 0,
            mcause: 0,
            mbadaddr: 0,
            mip: 0,
            mtime: 0,
        }
    }

    /// Reads a CSR value by its id.
    ///
    /// # Returns
    ///
    /// The stored value, or `None` when the id is not implemented.
    pub const fn read(&self, id: u16) -> Option<u64> {
        Some(match id {
            MISA => self.misa,
            MVENDORID => self.mvendorid,
            MARCHID => self.marchid,
            MIMPID => self.mimpid,
            MHARTID => self.mhartid,
            MSTATUS => self.mstatus,
            MIE => self.mie,
            MTVEC => self.mtvec,
            MSCRATCH => self.mscratch,
            MEPC => self.mepc,
            MCAUSE => self.mcause,
            MBADADDR => self.mbadaddr,
            MIP => self.mip,
            MTIME => self.mtime,
            _ => return None,
        })
    }

    /// Writes a value to a CSR by its id.
    ///
    /// `misa` and the identification registers are read-only; writes to them and to
    /// unknown ids are ignored.
    pub fn write(&mut self, id: u16, val: u64) {
        match id {
            MSTATUS => self.mstatus = val,
            MIE => self.mie = val,
            MTVEC => self.mtvec = val,
            MSCRATCH => self.mscratch = val,
            MEPC => self.mepc = val,
            MCAUSE => self.mcause = val,
            MBADADDR => self.mbadaddr = val,
            MIP => self.mip = val,
            MTIME => self.mtime = val,
            _ => {}
        }
    }

    /// Records an access fault: cause, faulting address and the PC it was raised at.
    pub const fn record_fault(&mut self, cause: u64, addr: u64, pc: u64) {
        self.mcause = cause;
        self.mbadaddr = addr;
        self.mepc = pc;
    }
}
