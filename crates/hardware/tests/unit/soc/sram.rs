//! # Memory Slave Tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvsoc_core::common::error::LoadError;
use rvsoc_core::soc::devices::{Slave, Sram};
use rvsoc_core::soc::transaction::{ByteMask, Direction, SlaveRequest, SlaveResponse};

fn masked_write(offset: u64, mask: u8, data: u64) -> SlaveRequest {
    SlaveRequest {
        offset,
        direction: Direction::Write,
        byte_mask: ByteMask(mask),
        data,
    }
}

#[rstest]
#[case::low_byte(0b0000_0001, 0xFFFF_FFFF_FFFF_FF11)]
#[case::high_byte(0b1000_0000, 0x11FF_FFFF_FFFF_FFFF)]
#[case::middle_half(0b0011_0000, 0xFFFF_1111_FFFF_FFFF)]
#[case::upper_word(0b1111_0000, 0x1111_1111_FFFF_FFFF)]
#[case::nothing(0b0000_0000, u64::MAX)]
fn writes_store_only_enabled_lanes(#[case] mask: u8, #[case] expected: u64) {
    let mut sram = Sram::new("sram", 64);
    let _ = sram.access(&SlaveRequest::write(8, u64::MAX));
    let resp = sram.access(&masked_write(8, mask, 0x1111_1111_1111_1111));
    assert_eq!(resp, SlaveResponse::ok(0));
    assert_eq!(sram.access(&SlaveRequest::read(8)), SlaveResponse::ok(expected));
    // Neighbouring doublewords are untouched.
    assert_eq!(sram.access(&SlaveRequest::read(0)).data, 0);
    assert_eq!(sram.access(&SlaveRequest::read(16)).data, 0);
}

#[test]
fn rom_acknowledges_but_ignores_writes() {
    let mut rom = Sram::rom("bootrom", 32);
    rom.load(0, &0x0102_0304_0506_0708u64.to_le_bytes()).unwrap();
    assert!(rom.is_read_only());
    assert_eq!(rom.access(&SlaveRequest::write(0, 0)), SlaveResponse::ok(0));
    assert_eq!(rom.access(&SlaveRequest::read(0)).data, 0x0102_0304_0506_0708);
}

#[test]
fn reads_past_the_backing_store_are_zero() {
    let mut sram = Sram::new("sram", 12);
    sram.load(8, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    assert_eq!(sram.access(&SlaveRequest::read(8)).data, 0xDDCC_BBAA);
    assert_eq!(sram.access(&SlaveRequest::read(0x100)).data, 0);
    // A write that falls off the end keeps the bytes that fit.
    let _ = sram.access(&SlaveRequest::write(8, 0x1111_1111_2222_2222));
    assert_eq!(sram.bytes()[8..], [0x22, 0x22, 0x22, 0x22]);
}

#[rstest]
#[case::past_end(60, 8)]
#[case::huge_offset(u64::MAX, 1)]
fn oversized_load_is_rejected(#[case] offset: u64, #[case] len: usize) {
    let mut sram = Sram::new("sram", 64);
    let err = sram.load(offset, &vec![0; len]).unwrap_err();
    assert!(matches!(
        err,
        LoadError::TooLarge { size: 64, len: l, .. } if l == len
    ));
    assert!(sram.bytes().iter().all(|&b| b == 0));
}

#[test]
fn load_fills_exactly_to_the_end() {
    let mut sram = Sram::new("sram", 16);
    sram.load(8, &[1; 8]).unwrap();
    assert_eq!(sram.len(), 16);
    assert_eq!(sram.access(&SlaveRequest::read(8)).data, 0x0101_0101_0101_0101);
}

#[test]
fn reset_clears_ram_but_not_rom() {
    let mut sram = Sram::new("sram", 16);
    let mut rom = Sram::rom("bootrom", 16);
    sram.load(0, &[9; 16]).unwrap();
    rom.load(0, &[9; 16]).unwrap();
    sram.reset();
    rom.reset();
    assert!(sram.bytes().iter().all(|&b| b == 0));
    assert!(rom.bytes().iter().all(|&b| b == 9));
}
