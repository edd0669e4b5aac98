//! Global Bus Constants.
//!
//! This module defines constants shared by the bus, the memory access adapter and
//! the debug support unit. It includes:
//! 1. **Bus geometry:** Data width, lane selection and byte-mask width.
//! 2. **DSU layout:** Region bases and register stride inside the debug window.
//! 3. **Limits:** Maximum number of masters and slaves addressable by an 8-bit bus id.

/// Bus data width in bits. The interconnect only supports a doubleword bus.
pub const BUS_DATA_BITS: u32 = 64;

/// Bus data width in bytes.
pub const BUS_DATA_BYTES: u64 = (BUS_DATA_BITS / 8) as u64;

/// Mask selecting the sub-doubleword byte offset of an address.
pub const LANE_MASK: u64 = BUS_DATA_BYTES - 1;

/// Byte mask with every lane enabled.
pub const FULL_BYTE_MASK: u8 = 0xFF;

/// Maximum number of masters or slaves on one bus (ids are 8 bits wide).
pub const MAX_BUS_ENTRIES: usize = 255;

/// Size of one DSU region in bytes.
pub const DSU_REGION_SIZE: u64 = 0x8000;

/// Distance between two consecutive DSU registers.
pub const DSU_REG_STRIDE: u64 = 8;

/// CSR region: register `id` lives at `id * DSU_REG_STRIDE`.
pub const DSU_CSR_BASE: u64 = 0x0_0000;

/// General register region: `x[n]` lives at `DSU_GPR_BASE + n * DSU_REG_STRIDE`.
pub const DSU_GPR_BASE: u64 = 0x0_8000;

/// Run control region (halt, step budget, clock and step counters).
pub const DSU_CONTROL_BASE: u64 = 0x1_0000;

/// Local region (soft reset strobe, arbiter diagnostics mirrors).
pub const DSU_LOCAL_BASE: u64 = 0x1_8000;

/// Total size of the DSU window.
pub const DSU_WINDOW_SIZE: u64 = 4 * DSU_REGION_SIZE;

/// Number of architectural general-purpose registers.
pub const GPR_COUNT: usize = 32;

/// Bus address width in bits.
pub const BUS_ADDR_BITS: u32 = 32;

/// Mask of the address bits carried by the bus.
pub const BUS_ADDR_MASK: u64 = (1 << BUS_ADDR_BITS) - 1;
