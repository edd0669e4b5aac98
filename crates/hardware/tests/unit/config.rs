//! # Configuration Tests
//!
//! Parsing, defaults and the validation rules applied when a configuration is frozen
//! into a bus map.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvsoc_core::common::error::ConfigError;
use rvsoc_core::config::{Config, CsrEntry, OverlapPolicy, SlaveConfig, SlaveKind};
use rvsoc_core::core::ReplayCore;
use rvsoc_core::soc::Soc;

use crate::common::harness::{GPIO_BASE, GPIO_MASK, SRAM_BASE, SRAM_MASK, two_slave_config};

#[test]
fn default_config_validates() {
    let map = Config::default().validate().unwrap();
    assert_eq!(map.masters().len(), 3);
    assert_eq!(map.slaves().len(), 6);
    assert_eq!(map.master("debug-host").unwrap().id.0, 2);
    assert!(!map.slave("uart").unwrap().enabled);
}

#[test]
fn partial_json_keeps_defaults() {
    let json = r#"{
        "general": { "max_ticks": 10 },
        "adapter": { "response_timeout": 8 }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.general.max_ticks, 10);
    assert_eq!(config.adapter.response_timeout, 8);
    assert_eq!(config.adapter.policy, OverlapPolicy::Reject);
    assert_eq!(config.dsu.csr_id("mtvec"), Some(0x305));
}

#[test]
fn json_slave_table_replaces_default_map() {
    let json = r#"{
        "bus": {
            "masters": [{ "name": "cpu-data" }, { "name": "cpu-instr" }],
            "slaves": [
                { "name": "ram", "kind": "Sram", "base": 268435456, "mask": 4294443008, "size": 1024 },
                { "name": "dsu", "kind": "Dsu", "base": 2148007936, "mask": 4294836224 },
                { "name": "pnp", "kind": "PNP", "base": 4294963200, "mask": 4294963200 }
            ]
        }
    }"#;
    let map = Config::from_json(json).unwrap().validate().unwrap();
    let ram = map.slave("ram").unwrap();
    assert_eq!(ram.size, 1024);
    assert_eq!(ram.vendor, 0x00F1);
    assert_eq!(map.slave("pnp").unwrap().kind, SlaveKind::Pnp);
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        Config::from_json("{ \"bus\": ").unwrap_err(),
        ConfigError::Parse(_)
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Config::load("/nonexistent/rvsoc.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn config_file_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("soc.json");
    std::fs::write(&path, serde_json::to_string(&Config::default()).unwrap()).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.bus.slaves, Config::default().bus.slaves);
}

#[rstest]
#[case::nested(0x1000_0000, 0xFFF8_0000, 0x1004_0000, 0xFFFF_0000)]
#[case::identical(0x8000_0000, 0xFFFF_F000, 0x8000_0000, 0xFFFF_F000)]
#[case::wider_second(0x8000_1000, 0xFFFF_F000, 0x8000_0000, 0xFFF0_0000)]
fn overlapping_enabled_windows_are_rejected(
    #[case] base_a: u64,
    #[case] mask_a: u64,
    #[case] base_b: u64,
    #[case] mask_b: u64,
) {
    let mut config = two_slave_config(&["cpu-data"]);
    config.bus.slaves = vec![
        SlaveConfig::new("a", SlaveKind::External, base_a, mask_a, 1),
        SlaveConfig::new("b", SlaveKind::External, base_b, mask_b, 2),
    ];
    match config.validate().unwrap_err() {
        ConfigError::Overlap { first, second } => {
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn overlap_with_a_disabled_window_is_allowed() {
    let mut config = two_slave_config(&["cpu-data"]);
    config.bus.slaves.push(SlaveConfig {
        enabled: false,
        ..SlaveConfig::new("shadow", SlaveKind::External, SRAM_BASE, SRAM_MASK, 3)
    });
    assert!(config.validate().is_ok());
}

#[rstest]
#[case::bits_below_mask(GPIO_BASE + 0x10, GPIO_MASK)]
#[case::above_bus_width(0x1_0000_0000, 0xFFFF_0000)]
fn misaligned_base_is_rejected(#[case] base: u64, #[case] mask: u64) {
    let mut config = two_slave_config(&["cpu-data"]);
    config.bus.slaves[1].base = base;
    config.bus.slaves[1].mask = mask;
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::MisalignedBase { .. }
    ));
}

#[test]
fn only_a_64_bit_data_bus_is_accepted() {
    let mut config = Config::default();
    config.bus.data_width_bits = 32;
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::UnsupportedDataWidth(32)
    ));
}

#[test]
fn duplicate_slave_names_are_rejected() {
    let mut config = two_slave_config(&["cpu-data"]);
    config.bus.slaves[1].name = "sram".to_string();
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::DuplicateName(name) if name == "sram"
    ));
}

#[test]
fn memory_larger_than_its_window_is_rejected() {
    let mut config = two_slave_config(&["cpu-data"]);
    config.bus.slaves[0].size = Some(0x10_0000);
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::SizeExceedsWindow { window: 0x8_0000, .. }
    ));
}

#[test]
fn second_dsu_is_rejected() {
    let mut config = Config::default();
    config.bus.slaves.push(SlaveConfig::new(
        "dsu2",
        SlaveKind::Dsu,
        0x9000_0000,
        0xFFFE_0000,
        0x80,
    ));
    assert!(matches!(config.validate().unwrap_err(), ConfigError::MultipleDsu));
}

#[test]
fn dsu_window_must_hold_the_register_map() {
    let mut config = Config::default();
    let dsu = config.bus.slaves.iter_mut().find(|s| s.name == "dsu").unwrap();
    dsu.mask = 0xFFFF_F000;
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::DsuWindowTooSmall { window: 0x1000, .. }
    ));
}

#[test]
fn pnp_window_must_hold_the_descriptor_block() {
    let mut config = Config::default();
    let pnp = config.bus.slaves.iter_mut().find(|s| s.name == "pnp").unwrap();
    pnp.mask = 0xFFFF_FFC0;
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::PnpWindowTooSmall { window: 0x40, required: 184, .. }
    ));
}

fn with_disabled_slots(extra: usize) -> Config {
    let mut config = Config::default();
    for i in 0..extra {
        let mut slot = SlaveConfig::new(
            &format!("slot{i}"),
            SlaveKind::External,
            0x9000_0000,
            0xFFFF_F000,
            0x10,
        );
        slot.enabled = false;
        config.bus.slaves.push(slot);
    }
    config
}

#[test]
fn registry_block_fills_its_window_exactly_then_overflows() {
    // 16-byte header, 3 masters at 8 bytes, 169 slaves at 24 bytes: 4096 bytes.
    let map = with_disabled_slots(163).validate().unwrap();
    assert_eq!(map.slaves().len(), 169);

    assert!(matches!(
        with_disabled_slots(164).validate().unwrap_err(),
        ConfigError::PnpWindowTooSmall { window: 0x1000, required: 4120, .. }
    ));
}

#[rstest]
#[case::same_id(vec![("a", 0x300), ("b", 0x300)])]
#[case::same_name(vec![("a", 0x300), ("a", 0x301)])]
fn duplicate_csr_entries_are_rejected(#[case] entries: Vec<(&str, u16)>) {
    let mut config = Config::default();
    config.dsu.csrs = entries
        .into_iter()
        .map(|(name, id)| CsrEntry {
            name: name.to_string(),
            id,
        })
        .collect();
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::DuplicateCsr { .. }
    ));
}

#[test]
fn csr_ids_must_fit_twelve_bits() {
    let mut config = Config::default();
    config.dsu.csrs.push(CsrEntry {
        name: "wide".to_string(),
        id: 0x1000,
    });
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::CsrOutOfRange { id: 0x1000, .. }
    ));
}

#[test]
fn soc_requires_both_cpu_masters() {
    let config = two_slave_config(&["cpu-data"]);
    let err = Soc::new(&config, Box::new(ReplayCore::idle())).unwrap_err();
    assert!(matches!(err, ConfigError::MissingMaster(name) if name == "cpu-instr"));
}
