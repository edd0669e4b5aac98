//! Validated bus map.
//!
//! `BusMap` is the one configuration source the rest of the SoC is generated from:
//! 1. **Descriptors:** Immutable master and slave descriptors with their bus ids.
//! 2. **Validation:** Overlap, alignment, size and table checks happen here, once.
//! 3. **Generation:** The address decoder and the plug-and-play registry are both built
//!    from the same `BusMap`, so the published map cannot drift from the decoded one.

use std::collections::HashSet;

use crate::common::constants::{BUS_ADDR_MASK, BUS_DATA_BITS, DSU_WINDOW_SIZE, MAX_BUS_ENTRIES};
use crate::common::error::ConfigError;
use crate::config::{Config, CsrEntry, SlaveKind};
use crate::soc::decoder::{self, AddressDecoder};
use crate::soc::devices::pnp;
use crate::soc::transaction::{MasterId, SlaveId};

/// Immutable description of one bus master.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterDescriptor {
    /// Bus id (position in the master table).
    pub id: MasterId,
    /// Name from the configuration.
    pub name: String,
    /// Disabled masters are never granted.
    pub enabled: bool,
    /// Vendor identifier.
    pub vendor: u16,
    /// Device identifier.
    pub device: u16,
}

/// Immutable description of one bus slave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveDescriptor {
    /// Bus id (position in the slave table).
    pub id: SlaveId,
    /// Name from the configuration.
    pub name: String,
    /// Implementation behind the window.
    pub kind: SlaveKind,
    /// Window base address.
    pub base: u64,
    /// Decode mask.
    pub mask: u64,
    /// Disabled slaves are published but never decoded.
    pub enabled: bool,
    /// Backing size in bytes (the window size unless configured smaller).
    pub size: u64,
    /// Vendor identifier.
    pub vendor: u16,
    /// Device identifier.
    pub device: u16,
}

impl SlaveDescriptor {
    /// Size of the decode window in bytes.
    pub const fn window_size(&self) -> u64 {
        (!self.mask & BUS_ADDR_MASK) + 1
    }
}

/// The validated, immutable map of one bus.
#[derive(Clone, Debug)]
pub struct BusMap {
    masters: Vec<MasterDescriptor>,
    slaves: Vec<SlaveDescriptor>,
    csrs: Vec<CsrEntry>,
    hw_id: u32,
    fw_id: u32,
}

impl BusMap {
    /// Validates `config` and freezes it into a bus map.
    ///
    /// # Arguments
    ///
    /// * `config` - The full configuration; bus, DSU CSR table and registry ids are used.
    ///
    /// # Returns
    ///
    /// The bus map, or the first violated rule as a `ConfigError`.
    ///
    /// # Errors
    ///
    /// Overlapping enabled windows, a base with bits outside its mask, a data width other
    /// than 64, duplicate names or CSR entries, too many entries, more than one DSU or
    /// registry, a memory larger than its window, or a DSU or registry window too small for
    /// its contents.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let bus = &config.bus;
        if bus.data_width_bits != BUS_DATA_BITS {
            return Err(ConfigError::UnsupportedDataWidth(bus.data_width_bits));
        }
        if bus.masters.len() > MAX_BUS_ENTRIES {
            return Err(ConfigError::TooManyMasters(bus.masters.len()));
        }
        if bus.slaves.len() > MAX_BUS_ENTRIES {
            return Err(ConfigError::TooManySlaves(bus.slaves.len()));
        }

        let mut names = HashSet::new();
        for name in bus.masters.iter().map(|m| &m.name) {
            if !names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }
        names.clear();
        for name in bus.slaves.iter().map(|s| &s.name) {
            if !names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }

        let masters: Vec<MasterDescriptor> = bus
            .masters
            .iter()
            .enumerate()
            .map(|(i, m)| MasterDescriptor {
                id: MasterId(i as u8),
                name: m.name.clone(),
                enabled: m.enabled,
                vendor: m.vendor,
                device: m.device,
            })
            .collect();

        let mut slaves = Vec::with_capacity(bus.slaves.len());
        for (i, s) in bus.slaves.iter().enumerate() {
            if s.base & !s.mask & BUS_ADDR_MASK != 0 || s.base > BUS_ADDR_MASK {
                return Err(ConfigError::MisalignedBase {
                    name: s.name.clone(),
                    base: s.base,
                    mask: s.mask,
                });
            }
            let window = (!s.mask & BUS_ADDR_MASK) + 1;
            let size = s.size.unwrap_or(window);
            if size > window {
                return Err(ConfigError::SizeExceedsWindow {
                    name: s.name.clone(),
                    size,
                    window,
                });
            }
            slaves.push(SlaveDescriptor {
                id: SlaveId(i as u8),
                name: s.name.clone(),
                kind: s.kind,
                base: s.base,
                mask: s.mask,
                enabled: s.enabled,
                size,
                vendor: s.vendor,
                device: s.device,
            });
        }

        if slaves.iter().filter(|s| s.kind == SlaveKind::Dsu).count() > 1 {
            return Err(ConfigError::MultipleDsu);
        }
        if let Some(dsu) = slaves
            .iter()
            .find(|s| s.kind == SlaveKind::Dsu && s.window_size() < DSU_WINDOW_SIZE)
        {
            return Err(ConfigError::DsuWindowTooSmall {
                name: dsu.name.clone(),
                window: dsu.window_size(),
                required: DSU_WINDOW_SIZE,
            });
        }
        if slaves.iter().filter(|s| s.kind == SlaveKind::Pnp).count() > 1 {
            return Err(ConfigError::MultiplePnp);
        }
        let required = pnp::block_len(masters.len(), slaves.len());
        if let Some(reg) = slaves
            .iter()
            .find(|s| s.kind == SlaveKind::Pnp && s.window_size() < required)
        {
            return Err(ConfigError::PnpWindowTooSmall {
                name: reg.name.clone(),
                window: reg.window_size(),
                required,
            });
        }

        let enabled: Vec<&SlaveDescriptor> = slaves.iter().filter(|s| s.enabled).collect();
        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                if decoder::windows_overlap(a.base, a.mask, b.base, b.mask) {
                    return Err(ConfigError::Overlap {
                        first: a.name.clone(),
                        second: b.name.clone(),
                    });
                }
            }
        }

        let mut ids = HashSet::new();
        let mut csr_names = HashSet::new();
        for csr in &config.dsu.csrs {
            if csr.id > 0xFFF {
                return Err(ConfigError::CsrOutOfRange {
                    name: csr.name.clone(),
                    id: csr.id,
                });
            }
            if !ids.insert(csr.id) || !csr_names.insert(csr.name.as_str()) {
                return Err(ConfigError::DuplicateCsr {
                    name: csr.name.clone(),
                    id: csr.id,
                });
            }
        }

        Ok(Self {
            masters,
            slaves,
            csrs: config.dsu.csrs.clone(),
            hw_id: config.dsu.hw_id,
            fw_id: config.dsu.fw_id,
        })
    }

    /// Master descriptors in bus-id order.
    pub fn masters(&self) -> &[MasterDescriptor] {
        &self.masters
    }

    /// Slave descriptors in bus-id order.
    pub fn slaves(&self) -> &[SlaveDescriptor] {
        &self.slaves
    }

    /// CSR table exposed by the DSU.
    pub fn csrs(&self) -> &[CsrEntry] {
        &self.csrs
    }

    /// Hardware id published by the registry.
    pub const fn hw_id(&self) -> u32 {
        self.hw_id
    }

    /// Firmware id published by the registry.
    pub const fn fw_id(&self) -> u32 {
        self.fw_id
    }

    /// Looks up a slave by name.
    pub fn slave(&self, name: &str) -> Option<&SlaveDescriptor> {
        self.slaves.iter().find(|s| s.name == name)
    }

    /// Looks up a master by name.
    pub fn master(&self, name: &str) -> Option<&MasterDescriptor> {
        self.masters.iter().find(|m| m.name == name)
    }

    /// Builds the address decoder for this map.
    pub fn decoder(&self) -> AddressDecoder {
        AddressDecoder::from_map(self)
    }
}
