//! Plug-and-play descriptor registry.
//!
//! A read-only slave that publishes the bus map so a host can discover it without prior
//! knowledge. The block is rendered once from the same [`BusMap`] the address decoder is
//! built from.
//!
//! # Layout (doublewords, little-endian)
//!
//! * `0x00`: `hw_id` in bits 0..32, `fw_id` in bits 32..64.
//! * `0x08`: master count (bits 0..8), slave count (8..16), data width in bits (16..24),
//!   address width in bits (24..32), total descriptor bytes (32..48).
//! * `0x10..`: descriptors, masters first, then slaves. Every descriptor starts with a
//!   header doubleword: size in bytes (bits 0..8), type (8..10: 1 master, 2 slave),
//!   enabled (bit 10), bus id (16..24), vendor (32..48), device (48..64).
//!   Slave descriptors are followed by their base and mask doublewords.
//!
//! Reads past the end of the block return zero; writes are acknowledged and ignored.

use crate::common::constants::{BUS_ADDR_BITS, BUS_DATA_BITS, BUS_DATA_BYTES};
use crate::soc::devices::Slave;
use crate::soc::map::BusMap;
use crate::soc::transaction::{SlaveRequest, SlaveResponse};

/// Offset of the first descriptor.
pub const PNP_TABLE_OFFSET: u64 = 0x10;

/// Size of a master descriptor in bytes.
pub const MASTER_DESCR_SIZE: u64 = 8;

/// Size of a slave descriptor in bytes.
pub const SLAVE_DESCR_SIZE: u64 = 24;

/// Size in bytes of the registry block for a bus with `masters` masters and `slaves` slaves.
pub const fn block_len(masters: usize, slaves: usize) -> u64 {
    PNP_TABLE_OFFSET + masters as u64 * MASTER_DESCR_SIZE + slaves as u64 * SLAVE_DESCR_SIZE
}

const TYPE_MASTER: u64 = 1;
const TYPE_SLAVE: u64 = 2;

/// Kind of a parsed descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PnpKind {
    /// A bus master.
    Master,
    /// A bus slave with its window.
    Slave {
        /// Window base address.
        base: u64,
        /// Window decode mask.
        mask: u64,
    },
}

/// One descriptor as a host sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PnpEntry {
    /// Master or slave (with window).
    pub kind: PnpKind,
    /// Bus id.
    pub bus_id: u8,
    /// Enabled flag.
    pub enabled: bool,
    /// Vendor identifier.
    pub vendor: u16,
    /// Device identifier.
    pub device: u16,
}

/// Everything a host learns from walking the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PnpTable {
    /// Hardware id.
    pub hw_id: u32,
    /// Firmware id.
    pub fw_id: u32,
    /// Number of master descriptors announced in the header.
    pub masters: u8,
    /// Number of slave descriptors announced in the header.
    pub slaves: u8,
    /// Data width in bits.
    pub data_width: u8,
    /// Address width in bits.
    pub addr_width: u8,
    /// Descriptors in table order.
    pub entries: Vec<PnpEntry>,
}

impl PnpTable {
    /// Walks a registry through a doubleword read function, as a debug host would.
    ///
    /// # Arguments
    ///
    /// * `read` - Reads the doubleword at a registry-relative offset.
    pub fn walk(mut read: impl FnMut(u64) -> u64) -> Self {
        let ids = read(0);
        let info = read(8);
        let masters = (info & 0xFF) as u8;
        let slaves = ((info >> 8) & 0xFF) as u8;
        let mut entries = Vec::with_capacity(usize::from(masters) + usize::from(slaves));
        let mut offset = PNP_TABLE_OFFSET;
        for _ in 0..(u16::from(masters) + u16::from(slaves)) {
            let header = read(offset);
            let size = header & 0xFF;
            let kind = match (header >> 8) & 0x3 {
                TYPE_SLAVE => PnpKind::Slave {
                    base: read(offset + 8),
                    mask: read(offset + 16),
                },
                _ => PnpKind::Master,
            };
            entries.push(PnpEntry {
                kind,
                bus_id: ((header >> 16) & 0xFF) as u8,
                enabled: (header >> 10) & 1 == 1,
                vendor: ((header >> 32) & 0xFFFF) as u16,
                device: (header >> 48) as u16,
            });
            if size == 0 {
                break;
            }
            offset += size;
        }
        Self {
            hw_id: ids as u32,
            fw_id: (ids >> 32) as u32,
            masters,
            slaves,
            data_width: ((info >> 16) & 0xFF) as u8,
            addr_width: ((info >> 24) & 0xFF) as u8,
            entries,
        }
    }
}

/// Read-only registry slave.
#[derive(Debug, Clone)]
pub struct PnpRegistry {
    name: String,
    words: Vec<u64>,
}

impl PnpRegistry {
    /// Renders the registry block from a validated bus map.
    pub fn new(name: &str, map: &BusMap) -> Self {
        let descr_bytes = block_len(map.masters().len(), map.slaves().len()) - PNP_TABLE_OFFSET;
        let mut words = vec![
            u64::from(map.hw_id()) | (u64::from(map.fw_id()) << 32),
            map.masters().len() as u64
                | (map.slaves().len() as u64) << 8
                | u64::from(BUS_DATA_BITS) << 16
                | u64::from(BUS_ADDR_BITS) << 24
                | (descr_bytes & 0xFFFF) << 32,
        ];
        for m in map.masters() {
            words.push(header(
                MASTER_DESCR_SIZE,
                TYPE_MASTER,
                m.enabled,
                m.id.0,
                m.vendor,
                m.device,
            ));
        }
        for s in map.slaves() {
            words.push(header(
                SLAVE_DESCR_SIZE,
                TYPE_SLAVE,
                s.enabled,
                s.id.0,
                s.vendor,
                s.device,
            ));
            words.push(s.base);
            words.push(s.mask);
        }
        Self {
            name: name.to_string(),
            words,
        }
    }

    /// Size of the rendered block in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.words.len() as u64 * BUS_DATA_BYTES
    }

    /// Reads the doubleword at a registry-relative offset.
    pub fn read(&self, offset: u64) -> u64 {
        usize::try_from(offset / BUS_DATA_BYTES)
            .ok()
            .and_then(|i| self.words.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Parses the rendered block back into descriptors.
    pub fn table(&self) -> PnpTable {
        PnpTable::walk(|offset| self.read(offset))
    }
}

const fn header(size: u64, kind: u64, enabled: bool, id: u8, vendor: u16, device: u16) -> u64 {
    size | kind << 8
        | (enabled as u64) << 10
        | (id as u64) << 16
        | (vendor as u64) << 32
        | (device as u64) << 48
}

impl Slave for PnpRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, req: &SlaveRequest) -> SlaveResponse {
        if req.is_write() {
            return SlaveResponse::ok(0);
        }
        SlaveResponse::ok(self.read(req.offset))
    }
}
