//! # Memory Access Adapter Tests
//!
//! Width adaptation, the one-transaction context, the overlap policies and the response
//! timeout, exercised against a real arbiter and SRAM.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use rvsoc_core::config::{AdapterConfig, OverlapPolicy};
use rvsoc_core::core::adapter::{extract, pack};
use rvsoc_core::core::{CpuRequest, CpuResponse, Issue};
use rvsoc_core::soc::transaction::{AccessWidth, ByteMask, Direction, MasterId, SlaveId};

use crate::common::harness::{AdapterBench, GPIO_BASE, SRAM_BASE, init_tracing};

fn config(policy: OverlapPolicy, response_timeout: u64) -> AdapterConfig {
    AdapterConfig {
        policy,
        response_timeout,
    }
}

fn bench() -> AdapterBench {
    AdapterBench::new(AdapterConfig::default())
}

fn preload(bench: &mut AdapterBench, offset: u64, value: u64) {
    bench
        .arbiter
        .slave_mut(SlaveId(0))
        .and_then(|s| s.as_sram_mut())
        .unwrap()
        .load(offset, &value.to_le_bytes())
        .unwrap();
}

#[test]
fn byte_store_is_packed_into_its_lane() {
    let req = pack(MasterId(0), &CpuRequest::write(0x1000_0003, AccessWidth::Byte, 0xAB));
    assert_eq!(req.addr, 0x1000_0000);
    assert_eq!(req.byte_mask, ByteMask(0b0000_1000));
    assert_eq!(req.direction, Direction::Write);
    assert_eq!((req.data >> 24) & 0xFF, 0xAB);
}

#[test]
fn byte_store_then_word_load() {
    init_tracing();
    let mut bench = bench();
    let store = bench.run(CpuRequest::write(SRAM_BASE + 3, AccessWidth::Byte, 0xAB));
    assert!(store.valid);
    assert_eq!(store.addr, SRAM_BASE + 3);

    let load = bench.run(CpuRequest::read(SRAM_BASE, AccessWidth::Word));
    assert_eq!(
        load,
        CpuResponse {
            valid: true,
            addr: SRAM_BASE,
            data: 0xAB00_0000,
            timed_out: false,
        }
    );
}

#[rstest]
#[case::byte(AccessWidth::Byte, 5, 0x66)]
#[case::half(AccessWidth::Half, 6, 0x8877)]
#[case::word(AccessWidth::Word, 4, 0x8877_6655)]
#[case::low_word(AccessWidth::Word, 0, 0x4433_2211)]
#[case::double(AccessWidth::Double, 0, 0x8877_6655_4433_2211)]
fn loads_are_shifted_and_truncated(
    #[case] width: AccessWidth,
    #[case] lane: u64,
    #[case] expected: u64,
) {
    let mut bench = bench();
    preload(&mut bench, 0x40, 0x8877_6655_4433_2211);
    let resp = bench.run(CpuRequest::read(SRAM_BASE + 0x40 + lane, width));
    assert_eq!(resp.data, expected);
    assert_eq!(resp.addr, SRAM_BASE + 0x40 + lane);
}

#[test]
fn response_takes_two_bus_ticks() {
    let mut bench = bench();
    assert_eq!(bench.adapter.issue(&CpuRequest::read(SRAM_BASE, AccessWidth::Double)), Issue::Accepted);
    assert!(bench.adapter.is_busy());
    assert!(bench.step().is_none());
    assert!(bench.adapter.is_busy());
    assert!(bench.step().is_some());
    assert!(!bench.adapter.is_busy());
    assert_eq!(bench.adapter.saved_lane(), None);
}

#[rstest]
#[case::half_last_lane(AccessWidth::Half, 7)]
#[case::word_straddle(AccessWidth::Word, 6)]
#[case::double_word(AccessWidth::Double, 4)]
#[case::double_byte(AccessWidth::Double, 7)]
fn doubleword_crossing_access_is_refused(#[case] width: AccessWidth, #[case] offset: u64) {
    let mut bench = bench();
    let issue = bench.adapter.issue(&CpuRequest::read(SRAM_BASE + offset, width));
    assert_eq!(issue, Issue::Misaligned);
    assert!(!bench.adapter.is_busy());
    assert!(bench.adapter.bus_request().is_none());
    assert_eq!(bench.adapter.stats().misaligned, 1);
    assert_eq!(bench.adapter.stats().accepted, 0);
}

#[rstest]
#[case::half_odd(AccessWidth::Half, 1, 0xBEEF, 0b0000_0110, 0x0000_0000_00BE_EF00)]
#[case::half_lane_five(AccessWidth::Half, 5, 0xBEEF, 0b0110_0000, 0x00BE_EF00_0000_0000)]
#[case::word_half(AccessWidth::Word, 2, 0xDEAD_BEEF, 0b0011_1100, 0x0000_DEAD_BEEF_0000)]
#[case::word_last_fit(AccessWidth::Word, 3, 0xDEAD_BEEF, 0b0111_1000, 0x00DE_ADBE_EF00_0000)]
fn in_lane_unaligned_access_reaches_the_bus(
    #[case] width: AccessWidth,
    #[case] offset: u64,
    #[case] value: u64,
    #[case] mask: u8,
    #[case] stored: u64,
) {
    let mut bench = bench();
    let store = CpuRequest::write(SRAM_BASE + 0x80 + offset, width, value);
    assert_eq!(bench.adapter.issue(&store), Issue::Accepted);
    let req = bench.adapter.bus_request().unwrap();
    assert_eq!(req.addr, SRAM_BASE + 0x80);
    assert_eq!(req.byte_mask, ByteMask(mask));
    assert_eq!(req.byte_mask.merge(0, req.data), stored);

    assert!(bench.step().is_none());
    let resp = bench.step().unwrap();
    assert!(resp.valid);
    assert_eq!(resp.addr, SRAM_BASE + 0x80 + offset);

    let dw = bench.run(CpuRequest::read(SRAM_BASE + 0x80, AccessWidth::Double));
    assert_eq!(dw.data, stored);
    let back = bench.run(CpuRequest::read(SRAM_BASE + 0x80 + offset, width));
    assert_eq!(back.data, value);
    assert_eq!(bench.adapter.stats().misaligned, 0);
}

#[test]
fn reject_policy_refuses_overlap() {
    let mut bench = bench();
    let first = CpuRequest::read(SRAM_BASE, AccessWidth::Word);
    assert_eq!(bench.adapter.issue(&first), Issue::Accepted);
    assert!(!bench.adapter.ready());
    let second = CpuRequest::read(SRAM_BASE + 4, AccessWidth::Word);
    assert_eq!(bench.adapter.issue(&second), Issue::Busy);
    assert_eq!(bench.adapter.saved_lane(), Some(0));

    let _ = bench.step();
    assert_eq!(bench.adapter.issue(&second), Issue::Busy);
    let resp = bench.step().unwrap();
    assert_eq!(resp.addr, SRAM_BASE);
    assert!(bench.adapter.ready());
    assert_eq!(bench.adapter.stats().rejected, 2);
}

#[test]
fn overwrite_policy_unpacks_the_older_response_with_the_newer_context() {
    let mut bench = AdapterBench::new(config(OverlapPolicy::Overwrite, 64));
    preload(&mut bench, 0, 0x8877_6655_4433_2211);

    assert_eq!(
        bench.adapter.issue(&CpuRequest::read(SRAM_BASE + 1, AccessWidth::Byte)),
        Issue::Accepted
    );
    assert!(bench.step().is_none());
    assert!(bench.adapter.ready());
    assert_eq!(
        bench.adapter.issue(&CpuRequest::read(SRAM_BASE + 4, AccessWidth::Word)),
        Issue::Accepted
    );
    assert_eq!(bench.adapter.stats().overwrites, 1);

    // The byte load's doubleword comes back but is read at the word's lane.
    let stale = bench.step().unwrap();
    assert_eq!(stale.addr, SRAM_BASE + 4);
    assert_eq!(stale.data, 0x8877_6655);
    assert_ne!(stale.data, 0x22);

    let fresh = bench.step().unwrap();
    assert_eq!(fresh.data, 0x8877_6655);
    assert!(!bench.adapter.is_busy());
}

#[test]
fn unanswered_transaction_times_out() {
    let mut bench = AdapterBench::new(config(OverlapPolicy::Reject, 3));
    assert_eq!(
        bench.adapter.issue(&CpuRequest::read(0x2000_0000, AccessWidth::Word)),
        Issue::Accepted
    );
    for _ in 0..3 {
        assert!(bench.step().is_none());
        assert!(bench.adapter.is_busy());
    }
    assert_eq!(
        bench.step(),
        Some(CpuResponse {
            valid: false,
            addr: 0x2000_0000,
            data: 0,
            timed_out: true,
        })
    );
    assert!(!bench.adapter.is_busy());
    assert_eq!(bench.adapter.stats().timeouts, 1);
    assert!(bench.arbiter.diagnostics().miss);
}

#[test]
fn short_timeout_still_sees_a_real_response() {
    let mut bench = AdapterBench::new(config(OverlapPolicy::Reject, 1));
    let resp = bench.run(CpuRequest::read(SRAM_BASE, AccessWidth::Word));
    assert!(resp.valid);
    assert!(!resp.timed_out);
}

#[test]
fn none_answer_is_invalid_not_timed_out() {
    let mut bench = bench();
    let resp = bench.run(CpuRequest::write(GPIO_BASE, AccessWidth::Word, 1));
    assert!(!resp.valid);
    assert!(!resp.timed_out);
    assert_eq!(bench.adapter.stats().timeouts, 0);
}

#[test]
fn reset_drops_the_context() {
    let mut bench = bench();
    let _ = bench.adapter.issue(&CpuRequest::read(SRAM_BASE, AccessWidth::Word));
    assert!(bench.step().is_none());
    bench.adapter.reset();
    assert!(!bench.adapter.is_busy());
    assert_eq!(bench.adapter.saved_lane(), None);
    // The response still on the bus has no context to land in.
    assert!(bench.step().is_none());
    assert_eq!(bench.adapter.stats().accepted, 1);
    assert_eq!(bench.adapter.stats().completed, 0);
}

fn in_lane_access() -> impl Strategy<Value = (AccessWidth, u64)> {
    prop::sample::select(AccessWidth::ALL.to_vec()).prop_flat_map(|width| {
        (0u64..512, 0..=(8 - width.bytes()))
            .prop_map(move |(slot, lane)| (width, SRAM_BASE + slot * 8 + lane))
    })
}

proptest! {
    #[test]
    fn mask_covers_exactly_the_accessed_bytes((width, addr) in in_lane_access()) {
        let req = pack(MasterId(0), &CpuRequest::read(addr, width));
        prop_assert_eq!(u64::from(req.byte_mask.count()), width.bytes());
        prop_assert_eq!(u64::from(req.byte_mask.0.trailing_zeros()), addr & 7);
        prop_assert_eq!(req.addr % 8, 0);
        prop_assert_eq!(req.addr, addr & !7);
    }

    #[test]
    fn extract_reads_the_addressed_lane(dw in any::<u64>(), (width, addr) in in_lane_access()) {
        let got = extract(dw, addr, width);
        let bytes = dw.to_le_bytes();
        let lane = (addr & 7) as usize;
        let mut want = [0u8; 8];
        want[..width.bytes() as usize].copy_from_slice(&bytes[lane..lane + width.bytes() as usize]);
        prop_assert_eq!(got, u64::from_le_bytes(want));
    }

    #[test]
    fn stores_only_touch_their_bytes(
        (width, addr) in in_lane_access(),
        value in any::<u64>(),
        background in any::<u64>(),
    ) {
        let mut bench = bench();
        let base = addr & !7;
        preload(&mut bench, base - SRAM_BASE, background);
        let _ = bench.run(CpuRequest::write(addr, width, value));
        let after = bench.run(CpuRequest::read(base, AccessWidth::Double)).data;

        let shift = 8 * (addr & 7);
        let field = width.value_mask() << shift;
        prop_assert_eq!(after & !field, background & !field);
        prop_assert_eq!((after & field) >> shift, value & width.value_mask());
    }
}
