//! Bus transaction schema.
//!
//! Every master and slave speaks the same fixed-width protocol:
//! 1. **Requests:** `{master, address, direction, width, byte mask, data, tag}` on a 64-bit bus.
//! 2. **Transactions:** A granted request together with the slave it was decoded to.
//! 3. **Responses:** `{master, slave, address, data, valid, tag}`, routed by the arbiter from
//!    remembered grant state.
//! 4. **Slave view:** The window-relative request a slave sees and the `{valid, data}` it answers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::constants::{BUS_DATA_BYTES, FULL_BYTE_MASK, LANE_MASK};

/// Bus id of a master. Lower ids win arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MasterId(pub u8);

/// Bus id of a slave, i.e. its index in the configured slave table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlaveId(pub u8);

impl MasterId {
    /// Returns the id as a table index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl SlaveId {
    /// Returns the id as a table index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Transfer direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Slave to master.
    Read,
    /// Master to slave.
    Write,
}

/// Width class of a CPU access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessWidth {
    /// 8 bits.
    Byte,
    /// 16 bits.
    Half,
    /// 32 bits.
    Word,
    /// 64 bits.
    Double,
}

impl AccessWidth {
    /// All width classes, narrowest first.
    pub const ALL: [Self; 4] = [Self::Byte, Self::Half, Self::Word, Self::Double];

    /// Number of bytes moved by an access of this width.
    #[inline(always)]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    /// Decodes the two-bit size field used by RISC-V loads and stores.
    pub const fn from_size_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Byte),
            1 => Some(Self::Half),
            2 => Some(Self::Word),
            3 => Some(Self::Double),
            _ => None,
        }
    }

    /// Unpositioned byte mask covering this width (lane 0 upwards).
    #[inline(always)]
    pub const fn lane_mask(self) -> u8 {
        match self {
            Self::Byte => 0x01,
            Self::Half => 0x03,
            Self::Word => 0x0F,
            Self::Double => FULL_BYTE_MASK,
        }
    }

    /// Bit mask selecting the low `8 * bytes()` bits of a value.
    #[inline(always)]
    pub const fn value_mask(self) -> u64 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
            Self::Double => u64::MAX,
        }
    }

    /// Copies the low `bytes()` of `value` into every lane of this width in a doubleword.
    ///
    /// A byte becomes eight copies, a halfword four, a word two. With the data replicated,
    /// the positioned byte mask alone decides which bytes a slave stores.
    pub const fn replicate(self, value: u64) -> u64 {
        match self {
            Self::Byte => (value & 0xFF).wrapping_mul(0x0101_0101_0101_0101),
            Self::Half => (value & 0xFFFF).wrapping_mul(0x0001_0001_0001_0001),
            Self::Word => (value & 0xFFFF_FFFF).wrapping_mul(0x0000_0001_0000_0001),
            Self::Double => value,
        }
    }
}

/// Per-byte write enables for one bus beat; bit `i` selects byte lane `i`.
///
/// The mask is `BUS_DATA_BYTES` bits wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct ByteMask(pub u8);

impl ByteMask {
    /// Every lane enabled.
    pub const FULL: Self = Self(FULL_BYTE_MASK);

    /// No lane enabled.
    pub const EMPTY: Self = Self(0);

    /// Mask for an access of `width` starting at the sub-doubleword offset of `addr`.
    ///
    /// Lanes that would fall past the end of the doubleword are dropped, matching a bus that
    /// cannot split a misaligned access.
    pub const fn positioned(width: AccessWidth, addr: u64) -> Self {
        let shifted = (width.lane_mask() as u16) << (addr & LANE_MASK);
        Self(shifted as u8)
    }

    /// Number of enabled lanes.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns `true` when lane `lane` is enabled.
    pub const fn lane(self, lane: u64) -> bool {
        lane < BUS_DATA_BYTES && (self.0 >> lane) & 1 == 1
    }

    /// Expands the mask into a 64-bit bit mask with `0xFF` in every enabled lane.
    pub const fn bits(self) -> u64 {
        let mut out = 0u64;
        let mut lane = 0;
        while lane < BUS_DATA_BYTES {
            if (self.0 >> lane) & 1 == 1 {
                out |= 0xFF << (lane * 8);
            }
            lane += 1;
        }
        out
    }

    /// Merges `new` into `old`, taking only the enabled lanes from `new`.
    pub const fn merge(self, old: u64, new: u64) -> u64 {
        let bits = self.bits();
        (old & !bits) | (new & bits)
    }
}

impl fmt::Binary for ByteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// A request as driven by a master onto the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusRequest {
    /// Requesting master.
    pub master: MasterId,
    /// Doubleword-aligned bus address.
    pub addr: u64,
    /// Transfer direction.
    pub direction: Direction,
    /// Width class of the originating CPU access (informational for slaves).
    pub width: AccessWidth,
    /// Lanes the transfer touches.
    pub byte_mask: ByteMask,
    /// Write data, lane-replicated; ignored for reads.
    pub data: u64,
    /// Master-chosen tag echoed in the response.
    pub tag: u64,
}

impl BusRequest {
    /// Full-doubleword read, as issued by a debug host.
    pub const fn read(master: MasterId, addr: u64) -> Self {
        Self {
            master,
            addr: addr & !LANE_MASK,
            direction: Direction::Read,
            width: AccessWidth::Double,
            byte_mask: ByteMask::FULL,
            data: 0,
            tag: 0,
        }
    }

    /// Full-doubleword write, as issued by a debug host.
    pub const fn write(master: MasterId, addr: u64, data: u64) -> Self {
        Self {
            master,
            addr: addr & !LANE_MASK,
            direction: Direction::Write,
            width: AccessWidth::Double,
            byte_mask: ByteMask::FULL,
            data,
            tag: 0,
        }
    }

    /// Returns the request with a different tag.
    #[must_use]
    pub const fn with_tag(mut self, tag: u64) -> Self {
        self.tag = tag;
        self
    }
}

/// A granted request: the request plus the slave the decoder selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Requesting master.
    pub master: MasterId,
    /// Decoded slave.
    pub slave: SlaveId,
    /// Doubleword-aligned bus address.
    pub addr: u64,
    /// Transfer direction.
    pub direction: Direction,
    /// Width class of the originating access.
    pub width: AccessWidth,
    /// Lanes the transfer touches.
    pub byte_mask: ByteMask,
    /// Write data.
    pub data: u64,
    /// Tag of the originating request.
    pub tag: u64,
}

impl Transaction {
    /// Binds a request to the slave it decoded to.
    pub const fn new(req: &BusRequest, slave: SlaveId) -> Self {
        Self {
            master: req.master,
            slave,
            addr: req.addr,
            direction: req.direction,
            width: req.width,
            byte_mask: req.byte_mask,
            data: req.data,
            tag: req.tag,
        }
    }
}

/// A response routed back to the master that owns the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusResponse {
    /// Master the response is delivered to.
    pub master: MasterId,
    /// Slave that answered.
    pub slave: SlaveId,
    /// Bus address of the transaction.
    pub addr: u64,
    /// Read data (a full doubleword); zero for writes.
    pub data: u64,
    /// `false` when the slave answered "none".
    pub valid: bool,
    /// Tag of the originating request.
    pub tag: u64,
}

/// The request as seen by a slave: window-relative and already granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlaveRequest {
    /// Doubleword-aligned offset inside the slave window.
    pub offset: u64,
    /// Transfer direction.
    pub direction: Direction,
    /// Lanes the transfer touches.
    pub byte_mask: ByteMask,
    /// Write data.
    pub data: u64,
}

impl SlaveRequest {
    /// Full-doubleword read at `offset`.
    pub const fn read(offset: u64) -> Self {
        Self {
            offset,
            direction: Direction::Read,
            byte_mask: ByteMask::FULL,
            data: 0,
        }
    }

    /// Full-doubleword write at `offset`.
    pub const fn write(offset: u64, data: u64) -> Self {
        Self {
            offset,
            direction: Direction::Write,
            byte_mask: ByteMask::FULL,
            data,
        }
    }

    /// Returns `true` for writes.
    pub const fn is_write(&self) -> bool {
        matches!(self.direction, Direction::Write)
    }
}

/// A slave's answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlaveResponse {
    /// The slave accepted the access.
    pub valid: bool,
    /// Read data.
    pub data: u64,
}

impl SlaveResponse {
    /// The fixed answer of a disabled or absent slave: not valid, no data.
    pub const NONE: Self = Self {
        valid: false,
        data: 0,
    };

    /// A valid answer carrying `data`.
    pub const fn ok(data: u64) -> Self {
        Self { valid: true, data }
    }
}
