//! # Address Decoder Tests
//!
//! Routing through the decoder built from a validated bus map, checked against a
//! brute-force scan of the configured windows.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use rvsoc_core::config::Config;
use rvsoc_core::soc::transaction::SlaveId;

use crate::common::harness::two_slave_config;

#[rstest]
#[case::sram_first_byte(0x1000_0000, Some(0))]
#[case::sram_last_byte(0x1007_FFFF, Some(0))]
#[case::gpio_register(0x8000_0010, Some(1))]
#[case::gpio_end(0x8000_0FFF, Some(1))]
#[case::past_gpio(0x8000_1000, None)]
#[case::hole(0x2000_0000, None)]
#[case::above_bus_width(0x1_1000_0000, None)]
fn two_slave_map_routes(#[case] addr: u64, #[case] expected: Option<u8>) {
    let map = two_slave_config(&["cpu-data"]).validate().unwrap();
    assert_eq!(map.decoder().decode(addr), expected.map(SlaveId));
}

#[test]
fn offset_is_window_relative() {
    let map = two_slave_config(&["cpu-data"]).validate().unwrap();
    let decoder = map.decoder();
    let entry = decoder.entry(0x8000_0010).unwrap();
    assert_eq!(entry.offset(0x8000_0010), 0x10);
    assert_eq!(entry.size(), 0x1000);
}

#[test]
fn disabled_windows_are_left_out() {
    let map = Config::default().validate().unwrap();
    let decoder = map.decoder();
    let uart = map.slave("uart").unwrap();
    assert_eq!(decoder.decode(uart.base), None);
    assert_eq!(decoder.entries().len(), map.slaves().len() - 1);
}

#[test]
fn default_map_routes_every_enabled_base_to_itself() {
    let map = Config::default().validate().unwrap();
    let decoder = map.decoder();
    for slave in map.slaves().iter().filter(|s| s.enabled) {
        assert_eq!(decoder.decode(slave.base), Some(slave.id), "{}", slave.name);
        let last = slave.base + slave.window_size() - 1;
        assert_eq!(decoder.decode(last), Some(slave.id), "{}", slave.name);
    }
}

proptest! {
    #[test]
    fn decode_matches_brute_force(addr in any::<u32>(), high in prop::bool::weighted(0.1)) {
        let map = Config::default().validate().unwrap();
        let decoder = map.decoder();
        let addr = u64::from(addr) | if high { 1 << 40 } else { 0 };

        let hits: Vec<SlaveId> = map
            .slaves()
            .iter()
            .filter(|s| s.enabled && !high && addr & s.mask == s.base & s.mask)
            .map(|s| s.id)
            .collect();
        prop_assert!(hits.len() <= 1);
        prop_assert_eq!(decoder.decode(addr), hits.first().copied());
    }
}
