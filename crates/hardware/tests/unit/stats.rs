//! # Statistics Tests

use pretty_assertions::assert_eq;
use rvsoc_core::stats::{STATS_SECTIONS, SimStats};

use crate::common::harness::{default_soc, dsu_base};

fn captured() -> SimStats {
    let mut soc = default_soc();
    let dsu = dsu_base(&soc);
    assert_eq!(soc.host_read(0x2000_0000), None);
    assert!(soc.host_write(0x1000_0000, 1));
    let _ = soc.host_write(dsu + 0x1_8000, 1);
    let mut stats = SimStats::start();
    stats.capture(&soc);
    stats
}

#[test]
fn capture_reads_the_soc_counters() {
    let stats = captured();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.miss_addr, Some(0x2000_0000));
    assert_eq!(stats.soft_resets, 1);
    let host = &stats.masters[2];
    assert_eq!(host.name, "debug-host");
    assert_eq!(host.write_ticks, 2);
    assert_eq!(host.read_ticks, 0);
    assert!(stats.ticks > 0);
}

#[test]
fn full_report_has_every_section() {
    let text = captured().render_sections(&[]);
    for heading in ["SIMULATION STATISTICS", "BUS UTILIZATION", "MEMORY ACCESS ADAPTERS", "DEBUG"] {
        assert!(text.contains(heading), "missing {heading}");
    }
    assert!(text.contains("unmapped.last_addr     0x20000000"));
    assert!(text.contains("debug-host"));
}

#[test]
fn sections_can_be_selected() {
    let text = captured().render_sections(&["bus".to_string()]);
    assert!(text.contains("BUS UTILIZATION"));
    assert!(!text.contains("MEMORY ACCESS ADAPTERS"));
    assert!(!text.contains("soft_resets"));
    assert!(!text.contains("sim_ticks"));
}

#[test]
fn every_section_name_renders_something() {
    let stats = captured();
    let frame = stats.render_sections(&["none".to_string()]);
    for section in STATS_SECTIONS {
        let text = stats.render_sections(&[(*section).to_string()]);
        assert!(text.len() > frame.len(), "{section}");
    }
}

#[test]
fn clean_run_has_no_miss_address() {
    let mut stats = SimStats::start();
    stats.capture(&default_soc());
    assert_eq!(stats.miss_addr, None);
    assert!(!stats.render_sections(&[]).contains("unmapped.last_addr"));
}
