use base::prelude::*;
use base::subword;

use super::{CharacterSelector, Operation, Resolution};
use crate::descriptor::SegmentDescriptor;
use crate::fault::{Fault, FaultKind};
use crate::memory::{MainMemory, Memory, MemoryConfiguration};
use crate::processor::{Processor, ProcessorConfiguration};
use crate::registers::{AddressingMode, DescriptorSegmentBase, Indicator, PointerRegister};

macro_rules! assert_octal_eq {
    ($left:expr, $right:expr $(,)?) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    panic!(
                        "Assertion failed: {:>#012o} != {:>#012o}",
                        left_val, right_val
                    );
                }
            }
        }
    }};
}

fn setup_with(config: ProcessorConfiguration) -> (Processor, MainMemory) {
    (
        Processor::new(config),
        MainMemory::new(&MemoryConfiguration {
            size_words: 0o100_000,
        }),
    )
}

fn setup() -> (Processor, MainMemory) {
    setup_with(ProcessorConfiguration::default())
}

fn tag(bits: u8) -> Tag {
    Tag::new(Unsigned6Bit::try_from(bits).expect("test tag should fit in 6 bits"))
}

fn addr(n: u32) -> WordAddress {
    WordAddress::try_from(n).expect("test address should fit in 18 bits")
}

fn seg(n: u16) -> SegmentNumber {
    SegmentNumber::try_from(n).expect("test segment number should fit")
}

fn ring(n: u8) -> Ring {
    Ring::try_from(n).expect("test ring should fit")
}

fn put(mem: &mut MainMemory, address: u32, value: u64) {
    mem.write36(
        PhysicalAddress::try_from(address).unwrap(),
        Unsigned36Bit::try_from(value).unwrap(),
    )
    .unwrap();
}

fn get(mem: &mut MainMemory, address: u32) -> u64 {
    u64::from(mem.read36(PhysicalAddress::try_from(address).unwrap()).unwrap())
}

fn indirect(address: u32, t: u8) -> u64 {
    (u64::from(address) << 18) | u64::from(t)
}

fn tally_word(address: u32, tally: u16, low: u8) -> u64 {
    (u64::from(address) << 18) | (u64::from(tally) << 6) | u64::from(low)
}

fn char_tally(address: u32, tally: u16, nine_bit: bool, position: u8) -> u64 {
    let tb = if nine_bit { 1 << 5 } else { 0 };
    (u64::from(address) << 18) | (u64::from(tally) << 6) | tb | u64::from(position)
}

fn resolve(
    p: &mut Processor,
    mem: &mut MainMemory,
    t: u8,
    address: u32,
    operation: Operation,
) -> Result<Resolution, Fault> {
    p.resolve(mem, tag(t), addr(address), operation)
}

fn operand(r: &Resolution) -> Option<u64> {
    r.operand.map(u64::from)
}

fn set_x(p: &mut Processor, n: u8, value: u32) {
    p.registers_mut()
        .set_index_register(Unsigned3Bit::try_from(n).unwrap(), addr(value));
}

fn runout(p: &Processor) -> bool {
    p.registers().indicators.is_set(Indicator::TallyRunout)
}

// Tags used below, in octal.
const N: u8 = 0o00;
const AU: u8 = 0o01;
const QU: u8 = 0o02;
const DU: u8 = 0o03;
const IC: u8 = 0o04;
const AL: u8 = 0o05;
const QL: u8 = 0o06;
const DL: u8 = 0o07;
const X1: u8 = 0o11;
const N_STAR: u8 = 0o20;
const DU_STAR: u8 = 0o23;
const X1_STAR: u8 = 0o31;
const F1: u8 = 0o40;
const ITP: u8 = 0o41;
const IT2: u8 = 0o42;
const ITS: u8 = 0o43;
const SD: u8 = 0o44;
const SCR: u8 = 0o45;
const F2: u8 = 0o46;
const F3: u8 = 0o47;
const CI: u8 = 0o50;
const I: u8 = 0o51;
const SC: u8 = 0o52;
const AD: u8 = 0o53;
const DI: u8 = 0o54;
const DIC: u8 = 0o55;
const ID: u8 = 0o56;
const IDC: u8 = 0o57;
const STAR_N: u8 = 0o60;
const STAR_DU: u8 = 0o63;
const STAR_X1: u8 = 0o71;

#[test]
fn test_no_modification() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, 0o123_456_701_234);
    let r = resolve(&mut p, &mut mem, N, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o100));
    assert_eq!(operand(&r), Some(0o123_456_701_234));
    assert_eq!(r.character, None);
    assert_eq!(p.registers().tpr.ca, addr(0o100));
}

#[test]
fn test_register_modification() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o10);
    {
        let regs = p.registers_mut();
        regs.a = subword::join_halves(addr(0o5), addr(0o7));
        regs.q = subword::join_halves(addr(0o20), addr(0o30));
        regs.ppr.ic = addr(0o40);
    }
    put(&mut mem, 0o110, 0o777);
    let r = resolve(&mut p, &mut mem, X1, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o110));
    assert_eq!(operand(&r), Some(0o777));

    for (t, expected) in [
        (AU, 0o105),
        (AL, 0o107),
        (QU, 0o120),
        (QL, 0o130),
        (IC, 0o140),
    ] {
        let r = resolve(&mut p, &mut mem, t, 0o100, Operation::PrepareOnly).unwrap();
        assert_eq!(r.effective_address, addr(expected), "tag {}", tag(t));
        assert_eq!(r.operand, None);
    }
}

#[test]
fn test_address_wraps() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o777_777);
    let r = resolve(&mut p, &mut mem, X1, 0, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o777_777));
    set_x(&mut p, 1, 2);
    let r = resolve(&mut p, &mut mem, X1, 0o777_777, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(1));
}

#[test]
fn test_direct_operands() {
    let (mut p, mut mem) = setup();
    let r = resolve(&mut p, &mut mem, DU, 0o1234, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o1234));
    assert_eq!(operand(&r), Some(0o001_234_000_000));
    let r = resolve(&mut p, &mut mem, DL, 0o1234, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o1234));
    let r = resolve(&mut p, &mut mem, DL, 0o1234, Operation::PrepareOnly).unwrap();
    assert_eq!(operand(&r), Some(0o1234));

    for t in [DU, DL] {
        let fault = resolve(&mut p, &mut mem, t, 0o1234, Operation::Write(u36!(1))).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::IPR);
    }
    // Nothing was stored anywhere.
    assert_octal_eq!(get(&mut mem, 0o1234), 0);

    // Memory ends at 0o100_000, so only a reference that skips
    // memory can succeed here.
    let r = resolve(&mut p, &mut mem, DU, 0o777_000, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o777_000_000_000));
    let r = resolve(&mut p, &mut mem, DL, 0o777_000, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o777_000));
    let fault = resolve(&mut p, &mut mem, N, 0o777_000, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::STR);
}

#[test]
fn test_write() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 3);
    let r = resolve(&mut p, &mut mem, X1, 0o100, Operation::Write(u36!(0o555))).unwrap();
    assert_eq!(r.effective_address, addr(0o103));
    assert_eq!(r.operand, None);
    assert_octal_eq!(get(&mut mem, 0o103), 0o555);
}

#[test]
fn test_register_then_indirect() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o10);
    put(&mut mem, 0o110, indirect(0o200, N));
    put(&mut mem, 0o200, 0o42);
    let r = resolve(&mut p, &mut mem, X1_STAR, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_eq!(operand(&r), Some(0o42));

    // The indirect word's own tag is applied next.
    put(&mut mem, 0o110, indirect(0o200, X1));
    let r = resolve(&mut p, &mut mem, X1_STAR, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o210));
}

#[test]
fn test_register_then_indirect_rejects_direct() {
    let (mut p, mut mem) = setup();
    let fault = resolve(&mut p, &mut mem, DU_STAR, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::IPR);
    assert!(fault.diagnostics.is_some());
}

#[test]
fn test_indirect_then_register() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o4);
    // *x1 -> n* -> plain word: x1 is applied at the very end.
    put(&mut mem, 0o100, indirect(0o200, N_STAR));
    put(&mut mem, 0o200, indirect(0o300, N));
    put(&mut mem, 0o304, 0o17);
    let r = resolve(&mut p, &mut mem, STAR_X1, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o304));
    assert_eq!(operand(&r), Some(0o17));
    assert_eq!(p.registers().held_register, None);
}

#[test]
fn test_later_indirect_register_replaces_held_register() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o4);
    put(&mut mem, 0o100, indirect(0o200, STAR_N));
    put(&mut mem, 0o200, indirect(0o300, N));
    let r = resolve(&mut p, &mut mem, STAR_X1, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o300));
}

#[test]
fn test_indirect_then_direct_operand() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, indirect(0o200, N));
    let r = resolve(&mut p, &mut mem, STAR_DU, 0o100, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o000_200_000_000));
    let fault = resolve(&mut p, &mut mem, STAR_DU, 0o100, Operation::Write(u36!(1))).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::IPR);
}

#[test]
fn test_indirect_tally_tag_ends_indirect_register_chain() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 3);
    put(&mut mem, 0o100, indirect(0o200, AD));
    put(&mut mem, 0o200, tally_word(0o400, 5, 1));
    let r = resolve(&mut p, &mut mem, STAR_X1, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o203));
    // The word at 0o200 was not used as a tally word.
    assert_octal_eq!(get(&mut mem, 0o200), tally_word(0o400, 5, 1));
}

#[test]
fn test_fault_tag_in_indirect_register_chain() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, indirect(0o200, F2));
    let fault = resolve(&mut p, &mut mem, STAR_X1, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DF2);
    assert_eq!(fault.subgroup(), 2);
}

#[test]
fn test_fault_tags() {
    let (mut p, mut mem) = setup();
    for (t, kind) in [(F1, FaultKind::DF1), (F2, FaultKind::DF2), (F3, FaultKind::DF3)] {
        let fault = resolve(&mut p, &mut mem, t, 0o100, Operation::Read).unwrap_err();
        assert_eq!(fault.kind(), kind);
    }
    // Reached through an indirect word.
    put(&mut mem, 0o100, indirect(0o200, F3));
    let fault = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DF3);
}

#[test]
fn test_illegal_indirect_tally_tags() {
    let (mut p, mut mem) = setup();
    for t in [ITP, IT2, ITS] {
        let fault = resolve(&mut p, &mut mem, t, 0o100, Operation::Read).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::IPR, "tag {:02o}", t);
    }
}

#[test]
fn test_indirect() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, indirect(0o200, AD));
    put(&mut mem, 0o200, 0o31);
    let first = resolve(&mut p, &mut mem, I, 0o100, Operation::Read).unwrap();
    let second = resolve(&mut p, &mut mem, I, 0o100, Operation::Read).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.effective_address, addr(0o200));
    assert_eq!(operand(&first), Some(0o31));
    // The tag field of the indirect word is ignored and nothing is
    // written back.
    assert_octal_eq!(get(&mut mem, 0o100), indirect(0o200, AD));
}

#[test]
fn test_add_delta() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, tally_word(0o200, 5, 3));
    put(&mut mem, 0o200, 0o7070);
    let r = resolve(&mut p, &mut mem, AD, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_eq!(operand(&r), Some(0o7070));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o203, 4, 3));
    assert!(!runout(&p));

    let r = resolve(&mut p, &mut mem, AD, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o203));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o206, 3, 3));
}

#[test]
fn test_subtract_delta() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, tally_word(0o200, 5, 3));
    let r = resolve(&mut p, &mut mem, SD, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o175));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o175, 6, 3));
}

#[test]
fn test_increment_and_decrement() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, tally_word(0o200, 2, 0));
    let r = resolve(&mut p, &mut mem, ID, 0o100, Operation::Write(u36!(0o66))).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_octal_eq!(get(&mut mem, 0o200), 0o66);
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o201, 1, 0));

    let r = resolve(&mut p, &mut mem, DI, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o200, 2, 0));
}

#[test]
fn test_tally_runout() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, tally_word(0o200, 1, 1));
    resolve(&mut p, &mut mem, AD, 0o100, Operation::PrepareOnly).unwrap();
    assert!(runout(&p));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o201, 0, 1));

    // Counting down from zero wraps to 0o7777, which clears the
    // indicator again.
    resolve(&mut p, &mut mem, ID, 0o100, Operation::PrepareOnly).unwrap();
    assert!(!runout(&p));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o202, 0o7777, 1));
}

#[test]
fn test_increment_with_continuation() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 5);
    // idc continues with x1*, reduced to n*.
    put(&mut mem, 0o100, tally_word(0o200, 2, X1_STAR));
    put(&mut mem, 0o200, indirect(0o300, N));
    put(&mut mem, 0o205, indirect(0o500, N));
    let r = resolve(&mut p, &mut mem, IDC, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o300));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o201, 1, X1_STAR));
}

#[test]
fn test_decrement_with_continuation() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, tally_word(0o200, 2, N));
    put(&mut mem, 0o177, 0o1234);
    let r = resolve(&mut p, &mut mem, DIC, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o177));
    assert_eq!(operand(&r), Some(0o1234));
    assert_octal_eq!(get(&mut mem, 0o100), tally_word(0o177, 3, N));
}

#[test]
fn test_character_indirect() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, char_tally(0o200, 7, false, 2));
    put(&mut mem, 0o200, 0o010_203_040_506);
    let r = resolve(&mut p, &mut mem, CI, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_eq!(operand(&r), Some(0o03));
    assert_eq!(
        r.character,
        Some(CharacterSelector {
            size: CharacterSize::Six,
            position: Unsigned3Bit::new::<2>(),
        })
    );
    assert_eq!(u8::from(p.registers().tpr.tbr), 12);
    // ci does not update its word.
    assert_octal_eq!(get(&mut mem, 0o100), char_tally(0o200, 7, false, 2));
}

#[test]
fn test_character_positions() {
    let (mut p, mut mem) = setup();
    for position in 0..8_u8 {
        put(&mut mem, 0o100, char_tally(0o200, 1, false, position));
        let result = resolve(&mut p, &mut mem, CI, 0o100, Operation::PrepareOnly);
        if position < 6 {
            assert!(result.is_ok(), "6-bit position {position}");
        } else {
            assert_eq!(
                result.map_err(|f| f.kind()),
                Err(FaultKind::IPR),
                "6-bit position {position}"
            );
        }

        put(&mut mem, 0o100, char_tally(0o200, 1, true, position));
        let result = resolve(&mut p, &mut mem, SC, 0o100, Operation::PrepareOnly);
        if position < 4 {
            assert!(result.is_ok(), "9-bit position {position}");
        } else {
            assert_eq!(
                result.map_err(|f| f.kind()),
                Err(FaultKind::IPR),
                "9-bit position {position}"
            );
            // The tally word is left alone.
            assert_octal_eq!(get(&mut mem, 0o100), char_tally(0o200, 1, true, position));
        }
    }
}

#[test]
fn test_sequence_character() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, char_tally(0o200, 3, false, 5));
    put(&mut mem, 0o200, 0o010_203_040_506);
    let r = resolve(&mut p, &mut mem, SC, 0o100, Operation::Write(u36!(0o77))).unwrap();
    assert_eq!(r.effective_address, addr(0o200));
    assert_eq!(r.operand, None);
    assert_octal_eq!(get(&mut mem, 0o200), 0o010_203_040_577);
    assert_octal_eq!(get(&mut mem, 0o100), char_tally(0o201, 2, false, 0));
    assert!(!runout(&p));
}

#[test]
fn test_sequence_character_reverse() {
    let (mut p, mut mem) = setup();
    put(&mut mem, 0o100, char_tally(0o200, 0o7777, true, 0));
    put(&mut mem, 0o177, 0o001_002_003_004);
    let r = resolve(&mut p, &mut mem, SCR, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o177));
    assert_eq!(operand(&r), Some(0o004));
    assert_eq!(u8::from(p.registers().tpr.tbr), 27);
    assert_octal_eq!(get(&mut mem, 0o100), char_tally(0o177, 0, true, 3));
    assert!(runout(&p));
}

#[test]
fn test_indirection_loop() {
    let (mut p, mut mem) = setup_with(ProcessorConfiguration {
        max_indirection_depth: 8,
        ..ProcessorConfiguration::default()
    });
    put(&mut mem, 0o100, indirect(0o100, N_STAR));
    let fault = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::LOOP);

    // A chain of exactly the permitted length is fine.
    for n in 0..7 {
        put(&mut mem, 0o200 + n, indirect(0o201 + n, N_STAR));
    }
    put(&mut mem, 0o207, indirect(0o300, N));
    let r = resolve(&mut p, &mut mem, N_STAR, 0o200, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o300));
}

#[test]
fn test_tally_loop() {
    let (mut p, mut mem) = setup_with(ProcessorConfiguration {
        max_indirection_depth: 4,
        ..ProcessorConfiguration::default()
    });
    // idc continues through an indirect word which leads back to the
    // same tally word.
    put(&mut mem, 0o100, tally_word(0o200, 0o7777, N_STAR));
    for n in 0..0o10 {
        put(&mut mem, 0o200 + n, indirect(0o100, IDC));
    }
    let fault = resolve(&mut p, &mut mem, IDC, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::LOOP);
}

const DS_BASE: u32 = 0o1000;

fn put_sdw(mem: &mut MainMemory, segment: u16, r1: u8, base: u32) {
    let sdw = SegmentDescriptor {
        addr: PhysicalAddress::try_from(base).unwrap(),
        r1: ring(r1),
        r2: ring(7),
        r3: ring(7),
        present: true,
        bound: Unsigned14Bit::try_from(0o17_u16).unwrap(),
        read: true,
        write: true,
        execute: true,
        unpaged: true,
        ..SegmentDescriptor::default()
    };
    let (even, odd) = sdw.to_words();
    let at = DS_BASE + 2 * u32::from(segment);
    put(mem, at, u64::from(even));
    put(mem, at + 1, u64::from(odd));
}

fn load_descriptor_segment(p: &mut Processor) {
    p.load_dsbr(DescriptorSegmentBase {
        addr: PhysicalAddress::try_from(DS_BASE).unwrap(),
        bound: Unsigned14Bit::ONE,
        unpaged: true,
        stack: Unsigned12Bit::ZERO,
    });
}

fn its_pair(segment: u16, r: u8, word_number: u32, t: u8) -> (u64, u64) {
    let pair = PointerPair::Segment {
        segment: seg(segment),
        ring: ring(r),
        target: PointerTarget {
            word_number: addr(word_number),
            bit_number: BitOffset::ZERO,
            tag: tag(t),
        },
    };
    let (even, odd) = pair.words();
    (u64::from(even), u64::from(odd))
}

#[test]
fn test_pointer_pair_in_absolute_mode() {
    let (mut p, mut mem) = setup();
    load_descriptor_segment(&mut p);
    put_sdw(&mut mem, 5, 7, 0o20_000);
    put(&mut mem, 0o20_010, 0o4242);
    let (even, odd) = its_pair(5, 3, 0o10, N);
    put(&mut mem, 0o100, even);
    put(&mut mem, 0o101, odd);

    let r = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o10));
    assert_eq!(operand(&r), Some(0o4242));
    let regs = p.registers();
    assert_eq!(regs.tpr.tsr, seg(5));
    assert_eq!(regs.tpr.trr, ring(3));
    assert_eq!(regs.addressing_mode, AddressingMode::Absolute);
    assert!(!regs.escalated);
}

#[test]
fn test_pointer_pair_escalation_ends_with_the_reference() {
    let (mut p, mut mem) = setup();
    load_descriptor_segment(&mut p);
    put_sdw(&mut mem, 5, 7, 0o20_000);
    let (even, odd) = its_pair(5, 3, 0o10, N);
    put(&mut mem, 0o100, even);
    put(&mut mem, 0o101, odd);
    put(&mut mem, 0o200, 0o1111);
    put(&mut mem, 0o20_200, 0o2222);

    resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::PrepareOnly).unwrap();
    // The TPR still names segment 5, but the next reference is absolute.
    assert_eq!(p.registers().tpr.tsr, seg(5));
    let r = resolve(&mut p, &mut mem, N, 0o200, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o1111));
}

#[test]
fn test_pointer_pair_escalation_ends_on_fault() {
    let (mut p, mut mem) = setup();
    load_descriptor_segment(&mut p);
    // Segment 0o20 is beyond the descriptor segment.
    let (even, odd) = its_pair(0o20, 0, 0o10, N);
    put(&mut mem, 0o100, even);
    put(&mut mem, 0o101, odd);
    put(&mut mem, 0o200, 0o1111);

    let fault = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::ACV);
    assert!(!p.registers().escalated);
    let r = resolve(&mut p, &mut mem, N, 0o200, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o1111));
}

#[test]
fn test_pointer_pair_ring_includes_r1() {
    let (mut p, mut mem) = setup();
    load_descriptor_segment(&mut p);
    // The pair lives in segment 2, whose write bracket ends at ring 4.
    put_sdw(&mut mem, 2, 4, 0o10_000);
    put_sdw(&mut mem, 5, 7, 0o20_000);
    let (even, odd) = its_pair(5, 3, 0o10, N);
    put(&mut mem, 0o10_100, even);
    put(&mut mem, 0o10_101, odd);
    {
        let regs = p.registers_mut();
        regs.addressing_mode = AddressingMode::Appending;
        regs.tpr.tsr = seg(2);
        regs.tpr.trr = ring(1);
    }
    let r = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::PrepareOnly).unwrap();
    assert_eq!(r.effective_address, addr(0o10));
    assert_eq!(p.registers().tpr.tsr, seg(5));
    assert_eq!(p.registers().tpr.trr, ring(4));
}

#[test]
fn test_pointer_register_pair() {
    let (mut p, mut mem) = setup();
    p.registers_mut().pr[2] = PointerRegister {
        rnr: ring(2),
        snr: seg(6),
        wordno: addr(0o100),
        bitno: BitOffset::try_from(30_u8).unwrap(),
    };
    let pair = PointerPair::PointerRegister {
        register: Unsigned3Bit::new::<2>(),
        target: PointerTarget {
            word_number: addr(5),
            bit_number: BitOffset::try_from(10_u8).unwrap(),
            tag: Tag::NONE,
        },
    };
    let (even, odd) = pair.words();
    put(&mut mem, 0o100, u64::from(even));
    put(&mut mem, 0o101, u64::from(odd));
    let r = resolve(&mut p, &mut mem, N_STAR, 0o100, Operation::PrepareOnly).unwrap();
    // 30 + 10 bits carries into the word number.
    assert_eq!(r.effective_address, addr(0o106));
    let tpr = p.registers().tpr;
    assert_eq!(tpr.tsr, seg(6));
    assert_eq!(tpr.trr, ring(2));
    assert_eq!(u8::from(tpr.tbr), 4);
}

#[test]
fn test_pointer_pair_needs_even_address() {
    let (mut p, mut mem) = setup();
    let (even, _) = its_pair(5, 0, 0o10, N);
    put(&mut mem, 0o101, even);
    // At an odd address the word is an ordinary indirect word whose
    // tag is its, which is not allowed.
    let fault = resolve(&mut p, &mut mem, N_STAR, 0o101, Operation::Read).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::IPR);
    assert_eq!(p.registers().addressing_mode, AddressingMode::Absolute);
}

#[test]
fn test_pointer_register_relative_instruction() {
    let (mut p, mut mem) = setup();
    load_descriptor_segment(&mut p);
    put_sdw(&mut mem, 5, 7, 0o20_000);
    put(&mut mem, 0o20_010, 0o3131);
    {
        let regs = p.registers_mut();
        regs.ppr.prr = ring(1);
        regs.pr[3] = PointerRegister {
            rnr: ring(0),
            snr: seg(5),
            wordno: addr(0o12),
            bitno: BitOffset::ZERO,
        };
        // pr3 with an offset of -2.
        regs.instruction = Instruction::from(&InstructionFields {
            address: addr(0o377_776),
            opcode: Unsigned9Bit::ZERO,
            opcode_extension: false,
            interrupt_inhibit: false,
            pointer_register: true,
            tag: Unsigned6Bit::ZERO,
        });
    }
    let r = p.resolve_instruction(&mut mem, Operation::Read).unwrap();
    assert_eq!(r.effective_address, addr(0o10));
    assert_eq!(operand(&r), Some(0o3131));
    let regs = p.registers();
    assert!(!regs.pointer_register_relative);
    assert_eq!(regs.tpr.tsr, seg(5));
    assert_eq!(regs.tpr.trr, ring(1));
    // The processor itself stays in absolute mode.
    assert_eq!(regs.addressing_mode, AddressingMode::Absolute);

    // A later reference does not inherit the pointer register routing.
    put(&mut mem, 0o10, 0o4545);
    let r = resolve(&mut p, &mut mem, N, 0o10, Operation::Read).unwrap();
    assert_eq!(operand(&r), Some(0o4545));
}

#[test]
fn test_instruction_without_pointer_register() {
    let (mut p, mut mem) = setup();
    set_x(&mut p, 1, 0o20);
    {
        let regs = p.registers_mut();
        regs.ppr.psr = seg(4);
        regs.ppr.prr = ring(2);
        regs.instruction = Instruction::from(&InstructionFields {
            address: addr(0o100),
            opcode: Unsigned9Bit::ZERO,
            opcode_extension: false,
            interrupt_inhibit: false,
            pointer_register: false,
            tag: Unsigned6Bit::try_from(X1).unwrap(),
        });
    }
    let r = p
        .resolve_instruction(&mut mem, Operation::PrepareOnly)
        .unwrap();
    assert_eq!(r.effective_address, addr(0o120));
    let regs = p.registers();
    assert!(!regs.pointer_register_relative);
    assert_eq!(regs.tpr.tsr, seg(4));
    assert_eq!(regs.tpr.trr, ring(2));
}
