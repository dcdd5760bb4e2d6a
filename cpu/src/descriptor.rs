//! In-core descriptor formats.
//!
//! A segment descriptor word pair (SDW) describes one segment: where
//! it is, how long it is, and who may do what to it.  A page table
//! word (PTW) describes one 1024-word page of a paged segment.
//!
//! Bit 0 is the least significant bit of each word.
//!
//! SDW even word: ADDR 12-35, R1 9-11, R2 6-8, R3 3-5, F 2, FC 0-1.
//! SDW odd word: BOUND 21-34, R 20, E 19, W 18, P 17, U 16, G 15,
//! C 14, CL 0-13.
//!
//! PTW: ADDR 18-35 (page address in 64-word units), U 9, M 6, F 2,
//! FC 0-1.

use serde::Serialize;

#[cfg(test)]
use test_strategy::proptest;

use base::prelude::*;
use base::subword;

/// Number of words in a page.
pub const PAGE_SIZE: u32 = 1024;

const PAGE_OFFSET_MASK: u32 = PAGE_SIZE - 1;

/// Split a segment offset into a page number and the offset within
/// that page.
pub fn split_page_offset(offset: WordAddress) -> (Unsigned18Bit, u32) {
    let bits = u32::from(offset);
    (offset >> 10, bits & PAGE_OFFSET_MASK)
}

/// A segment descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentDescriptor {
    /// Physical address of the segment, or of its page table.
    pub addr: PhysicalAddress,
    /// Top of the write bracket.
    pub r1: Ring,
    /// Top of the read/execute bracket.
    pub r2: Ring,
    /// Top of the call bracket.
    pub r3: Ring,
    /// F: the descriptor is valid.  When clear, referencing the
    /// segment raises directed fault `fault_code`.
    pub present: bool,
    pub fault_code: Unsigned2Bit,
    /// Highest valid 16-word block of the segment.
    pub bound: Unsigned14Bit,
    pub read: bool,
    pub execute: bool,
    pub write: bool,
    pub privileged: bool,
    /// U: the segment is not paged.
    pub unpaged: bool,
    /// G: entry is restricted to the gates below `call_limiter`.
    pub gate: bool,
    pub cache: bool,
    pub call_limiter: Unsigned14Bit,
}

impl SegmentDescriptor {
    pub fn from_words(even: Unsigned36Bit, odd: Unsigned36Bit) -> SegmentDescriptor {
        SegmentDescriptor {
            addr: subword::field(even, 12),
            r1: subword::field(even, 9),
            r2: subword::field(even, 6),
            r3: subword::field(even, 3),
            present: subword::bit(even, 2),
            fault_code: subword::field(even, 0),
            bound: subword::field(odd, 21),
            read: subword::bit(odd, 20),
            execute: subword::bit(odd, 19),
            write: subword::bit(odd, 18),
            privileged: subword::bit(odd, 17),
            unpaged: subword::bit(odd, 16),
            gate: subword::bit(odd, 15),
            cache: subword::bit(odd, 14),
            call_limiter: subword::field(odd, 0),
        }
    }

    pub fn to_words(&self) -> (Unsigned36Bit, Unsigned36Bit) {
        let mut even = subword::deposit(Unsigned36Bit::ZERO, 12, self.addr);
        even = subword::deposit(even, 9, self.r1);
        even = subword::deposit(even, 6, self.r2);
        even = subword::deposit(even, 3, self.r3);
        even = subword::with_bit(even, 2, self.present);
        even = subword::deposit(even, 0, self.fault_code);

        let mut odd = subword::deposit(Unsigned36Bit::ZERO, 21, self.bound);
        odd = subword::with_bit(odd, 20, self.read);
        odd = subword::with_bit(odd, 19, self.execute);
        odd = subword::with_bit(odd, 18, self.write);
        odd = subword::with_bit(odd, 17, self.privileged);
        odd = subword::with_bit(odd, 16, self.unpaged);
        odd = subword::with_bit(odd, 15, self.gate);
        odd = subword::with_bit(odd, 14, self.cache);
        odd = subword::deposit(odd, 0, self.call_limiter);
        (even, odd)
    }

    /// The ring brackets must satisfy R1 <= R2 <= R3.
    pub fn rings_are_ordered(&self) -> bool {
        self.r1 <= self.r2 && self.r2 <= self.r3
    }

    /// True if `offset` lies beyond the segment bound.
    pub fn is_out_of_bounds(&self, offset: WordAddress) -> bool {
        u32::from(offset) >> 4 > u32::from(self.bound)
    }
}

/// A page table word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    /// The page address in units of 64 words.
    pub addr: Unsigned18Bit,
    pub used: bool,
    pub modified: bool,
    pub present: bool,
    pub fault_code: Unsigned2Bit,
}

const PTW_USED_BIT: u32 = 9;
const PTW_MODIFIED_BIT: u32 = 6;

impl PageDescriptor {
    pub fn from_word(w: Unsigned36Bit) -> PageDescriptor {
        PageDescriptor {
            addr: subword::upper_half(w),
            used: subword::bit(w, PTW_USED_BIT),
            modified: subword::bit(w, PTW_MODIFIED_BIT),
            present: subword::bit(w, 2),
            fault_code: subword::field(w, 0),
        }
    }

    pub fn to_word(&self) -> Unsigned36Bit {
        let mut w = subword::join_halves(self.addr, Unsigned18Bit::ZERO);
        w = subword::with_bit(w, PTW_USED_BIT, self.used);
        w = subword::with_bit(w, PTW_MODIFIED_BIT, self.modified);
        w = subword::with_bit(w, 2, self.present);
        subword::deposit(w, 0, self.fault_code)
    }

    /// Physical address of the first word of the page.
    pub fn page_base(&self) -> PhysicalAddress {
        PhysicalAddress::from(self.addr) << 6
    }

    /// Return `w` with the used bit set, leaving the other bits of
    /// the in-core word alone.
    pub fn mark_used(w: Unsigned36Bit) -> Unsigned36Bit {
        subword::with_bit(w, PTW_USED_BIT, true)
    }

    /// Return `w` with the modified bit set.
    pub fn mark_modified(w: Unsigned36Bit) -> Unsigned36Bit {
        subword::with_bit(w, PTW_MODIFIED_BIT, true)
    }
}

#[cfg(test)]
#[proptest]
fn sdw_words_survive_decoding(
    #[strategy(0..(1_u64 << 36))] even: u64,
    #[strategy(0..(1_u64 << 36))] odd: u64,
) {
    let even = Unsigned36Bit::try_from(even).unwrap();
    let odd = Unsigned36Bit::try_from(odd).unwrap();
    let sdw = SegmentDescriptor::from_words(even, odd);
    // Every bit of the even word is defined; bit 35 of the odd word
    // is not.
    assert_eq!(sdw.to_words(), (even, odd & 0o377_777_777_777_u64));
    let (e2, o2) = sdw.to_words();
    assert_eq!(SegmentDescriptor::from_words(e2, o2), sdw);
}

#[cfg(test)]
#[proptest]
fn ptw_word_survives_decoding(#[strategy(0..(1_u64 << 36))] w: u64) {
    let w = Unsigned36Bit::try_from(w).unwrap();
    let ptw = PageDescriptor::from_word(w);
    assert_eq!(ptw.to_word(), w & 0o777_777_001_107_u64);
    assert_eq!(PageDescriptor::from_word(ptw.to_word()), ptw);
}
