//! Static address decoder.
//!
//! Maps a bus address to the unique enabled slave whose window contains it. Windows are
//! `(base, mask)` pairs: an address `a` hits when `a & mask == base & mask`. The masked
//! bases are computed once when the decoder is built from a validated [`BusMap`]; overlap
//! between enabled windows is rejected there, so at run time the first hit is the only hit.

use crate::common::constants::BUS_ADDR_MASK;
use crate::soc::map::BusMap;
use crate::soc::transaction::SlaveId;

/// One precomputed decode window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeEntry {
    /// Slave selected by this window.
    pub slave: SlaveId,
    /// Effective mask, including the bits above the bus address width.
    pub mask: u64,
    /// `base & mask`.
    pub match_value: u64,
}

impl DecodeEntry {
    /// Builds a window; address bits above the bus width must be zero to match.
    pub const fn new(slave: SlaveId, base: u64, mask: u64) -> Self {
        let mask = effective_mask(mask);
        Self {
            slave,
            mask,
            match_value: base & mask,
        }
    }

    /// Returns `true` when `addr` falls inside this window.
    #[inline(always)]
    pub const fn hits(&self, addr: u64) -> bool {
        addr & self.mask == self.match_value
    }

    /// Offset of `addr` inside this window.
    #[inline(always)]
    pub const fn offset(&self, addr: u64) -> u64 {
        addr & !self.mask
    }

    /// Size of the window in bytes.
    pub const fn size(&self) -> u64 {
        (!self.mask).wrapping_add(1)
    }
}

/// Decode table for the enabled slaves of one bus.
#[derive(Clone, Debug, Default)]
pub struct AddressDecoder {
    entries: Vec<DecodeEntry>,
}

impl AddressDecoder {
    /// Builds the decoder from the enabled slaves of a validated map.
    ///
    /// Disabled slaves are left out, so accesses to them are reported exactly like
    /// accesses to unmapped space.
    pub fn from_map(map: &BusMap) -> Self {
        let entries = map
            .slaves()
            .iter()
            .filter(|s| s.enabled)
            .map(|s| DecodeEntry::new(s.id, s.base, s.mask))
            .collect();
        Self { entries }
    }

    /// Returns the slave claiming `addr`, or `None` when no enabled slave does.
    pub fn decode(&self, addr: u64) -> Option<SlaveId> {
        self.entry(addr).map(|e| e.slave)
    }

    /// Returns the window claiming `addr`.
    pub fn entry(&self, addr: u64) -> Option<&DecodeEntry> {
        self.entries.iter().find(|e| e.hits(addr))
    }

    /// All decode windows, in slave order.
    pub fn entries(&self) -> &[DecodeEntry] {
        &self.entries
    }
}

/// Extends a configured mask so that addresses beyond the bus width never decode.
#[inline(always)]
pub const fn effective_mask(mask: u64) -> u64 {
    mask | !BUS_ADDR_MASK
}

/// Returns `true` when two windows share at least one address.
///
/// An address in both windows must agree with each base on that window's mask bits.
/// Bits outside either mask are free, so the windows intersect exactly when the bases
/// agree on every bit both masks constrain.
pub const fn windows_overlap(base_a: u64, mask_a: u64, base_b: u64, mask_b: u64) -> bool {
    let common = effective_mask(mask_a) & effective_mask(mask_b);
    (base_a ^ base_b) & common == 0
}
