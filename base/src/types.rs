//! Names for the machine quantities which the processor passes
//! around.  These are aliases rather than new types; the width of the
//! underlying fixed-width type already prevents most mix-ups.
use super::unsigned::{
    Unsigned12Bit, Unsigned15Bit, Unsigned18Bit, Unsigned24Bit, Unsigned36Bit, Unsigned3Bit,
    Unsigned6Bit,
};

/// A machine word.
pub type Word = Unsigned36Bit;

/// An offset within a segment, or a computed address in absolute
/// mode.
pub type WordAddress = Unsigned18Bit;

/// An address in physical memory.
pub type PhysicalAddress = Unsigned24Bit;

/// A segment number.
pub type SegmentNumber = Unsigned15Bit;

/// A ring number.  Ring 0 is the most privileged.
pub type Ring = Unsigned3Bit;

/// The count field of a tally word.
pub type Tally = Unsigned12Bit;

/// A bit offset within a word, counted from the most significant
/// end.
pub type BitOffset = Unsigned6Bit;

#[test]
fn test_ring_ordering() {
    const KERNEL: Ring = Ring::ZERO;
    const USER: Ring = Ring::new::<4>();

    // Access checks compare rings numerically; a larger ring number
    // is less privileged.
    assert!(USER > KERNEL);
    assert_eq!(std::cmp::max(USER, KERNEL), USER);
    assert_eq!(Ring::MAX, 7_u8);
}
