//! # Plug-and-Play Registry Tests
//!
//! The registry must publish exactly the map the decoder routes, disabled entries
//! included, and stay read-only.

use pretty_assertions::assert_eq;
use rvsoc_core::config::{Config, SlaveKind};
use rvsoc_core::soc::devices::pnp::{MASTER_DESCR_SIZE, PNP_TABLE_OFFSET, SLAVE_DESCR_SIZE};
use rvsoc_core::soc::devices::{PnpKind, PnpRegistry, PnpTable};

use crate::common::harness::{default_soc, pnp_base, two_slave_config};

#[test]
fn host_walk_matches_the_rendered_table() {
    let mut soc = default_soc();
    let base = pnp_base(&soc);
    let expected = PnpRegistry::new("pnp", soc.map()).table();
    let walked = PnpTable::walk(|offset| soc.host_read(base + offset).unwrap());
    assert_eq!(walked, expected);
}

#[test]
fn header_describes_the_bus() {
    let map = Config::default().validate().unwrap();
    let table = PnpRegistry::new("pnp", &map).table();
    assert_eq!(table.hw_id, 0x2016_0323);
    assert_eq!(table.fw_id, 0x2016_0401);
    assert_eq!((table.masters, table.slaves), (3, 6));
    assert_eq!((table.data_width, table.addr_width), (64, 32));
    assert_eq!(table.entries.len(), 9);
}

#[test]
fn block_size_covers_header_and_descriptors() {
    let map = Config::default().validate().unwrap();
    let registry = PnpRegistry::new("pnp", &map);
    assert_eq!(
        registry.len_bytes(),
        PNP_TABLE_OFFSET + 3 * MASTER_DESCR_SIZE + 6 * SLAVE_DESCR_SIZE
    );
    assert_eq!(registry.read(registry.len_bytes()), 0);
    assert_eq!(registry.read(u64::MAX & !7), 0);
}

#[test]
fn entries_mirror_the_bus_map() {
    let map = Config::default().validate().unwrap();
    let table = PnpRegistry::new("pnp", &map).table();

    let (masters, slaves) = table.entries.split_at(map.masters().len());
    for (entry, master) in masters.iter().zip(map.masters()) {
        assert_eq!(entry.kind, PnpKind::Master);
        assert_eq!(entry.bus_id, master.id.0);
        assert_eq!((entry.vendor, entry.device), (master.vendor, master.device));
        assert!(entry.enabled);
    }
    for (entry, slave) in slaves.iter().zip(map.slaves()) {
        assert_eq!(
            entry.kind,
            PnpKind::Slave {
                base: slave.base,
                mask: slave.mask
            }
        );
        assert_eq!(entry.bus_id, slave.id.0);
        assert_eq!(entry.enabled, slave.enabled, "{}", slave.name);
        assert_eq!(entry.device, slave.device);
    }
}

#[test]
fn disabled_slave_is_published_but_not_decoded() {
    let mut soc = default_soc();
    let base = pnp_base(&soc);
    let uart = soc.map().slave("uart").unwrap().clone();
    let table = PnpTable::walk(|offset| soc.host_read(base + offset).unwrap());

    let entry = table
        .entries
        .iter()
        .find(|e| e.device == uart.device)
        .unwrap();
    assert!(!entry.enabled);
    assert_eq!(
        entry.kind,
        PnpKind::Slave {
            base: uart.base,
            mask: uart.mask
        }
    );
    assert_eq!(soc.host_read(uart.base), None);
    assert_eq!(soc.diagnostics().miss_addr, uart.base);
}

#[test]
fn registry_ignores_host_writes() {
    let mut soc = default_soc();
    let base = pnp_base(&soc);
    let before = soc.host_read(base).unwrap();
    assert!(soc.host_write(base, 0));
    assert_eq!(soc.host_read(base), Some(before));
}

#[test]
fn registry_tracks_a_custom_map() {
    let mut config = two_slave_config(&["cpu-data", "cpu-instr"]);
    config.bus.slaves.push(rvsoc_core::config::SlaveConfig::new(
        "pnp",
        SlaveKind::Pnp,
        0xFFFF_F000,
        0xFFFF_F000,
        0x74,
    ));
    let map = config.validate().unwrap();
    let table = PnpRegistry::new("pnp", &map).table();
    assert_eq!((table.masters, table.slaves), (2, 3));
    assert_eq!(
        table.entries[3].kind,
        PnpKind::Slave {
            base: 0x8000_0000,
            mask: 0xFFFF_F000
        }
    );
}
