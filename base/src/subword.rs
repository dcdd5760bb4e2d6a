//! Various convenience utilities for splitting 36-bit words into
//! smaller components and for joining them together.
//!
//! Bit 0 is the least significant bit of the word throughout.  The
//! "upper" half of a word is bits 18-35; on this machine that half
//! usually holds an address.
use std::ops::Shl;

use crate::error::ConversionFailed;
use crate::unsigned::{FixedWidth, Unsigned18Bit, Unsigned36Bit, Unsigned3Bit, Unsigned6Bit, Unsigned9Bit};

/// Number of 6-bit characters in a word.
pub const CHARS_PER_WORD: u8 = 6;
/// Number of 9-bit bytes in a word.
pub const BYTES_PER_WORD: u8 = 4;

/// Split a 36-bit word into its upper and lower 18-bit halves.
pub fn split_halves(w: Unsigned36Bit) -> (Unsigned18Bit, Unsigned18Bit) {
    (upper_half(w), lower_half(w))
}

/// Join two 18-bit values into a 36-bit word.
pub fn join_halves(upper: Unsigned18Bit, lower: Unsigned18Bit) -> Unsigned36Bit {
    Unsigned36Bit::from(upper).shl(18) | Unsigned36Bit::from(lower)
}

/// Extract the upper (more-significant) halfword from a full word.
pub fn upper_half(word: Unsigned36Bit) -> Unsigned18Bit {
    field(word, 18)
}

/// Extract the lower (less-significant) halfword from a full word.
pub fn lower_half(word: Unsigned36Bit) -> Unsigned18Bit {
    field(word, 0)
}

/// Extract the field of type `T` whose least significant bit is bit
/// `shift` of `word`.
pub fn field<T: FixedWidth>(word: Unsigned36Bit, shift: u32) -> T {
    T::truncating_from(u64::from(word) >> shift)
}

/// Return `word` with the field of type `T` at bit `shift` replaced
/// by `value`.  All other bits are unchanged.
pub fn deposit<T: FixedWidth>(word: Unsigned36Bit, shift: u32, value: T) -> Unsigned36Bit {
    let mask: u64 = ((1_u64 << T::BITS) - 1) << shift;
    let bits: u64 = (u64::from(word) & !mask) | ((value.to_u64() << shift) & mask);
    Unsigned36Bit::truncating_from(bits)
}

/// Extract a single bit.
pub fn bit(word: Unsigned36Bit, n: u32) -> bool {
    (u64::from(word) >> n) & 1 != 0
}

/// Return `word` with bit `n` set to `value`.
pub fn with_bit(word: Unsigned36Bit, n: u32, value: bool) -> Unsigned36Bit {
    let mask: u64 = 1 << n;
    let bits: u64 = u64::from(word);
    Unsigned36Bit::truncating_from(if value { bits | mask } else { bits & !mask })
}

fn char6_shift(pos: Unsigned3Bit) -> Result<u32, ConversionFailed> {
    let pos = u32::from(pos);
    if pos >= u32::from(CHARS_PER_WORD) {
        Err(ConversionFailed::TooLarge)
    } else {
        Ok(30 - 6 * pos)
    }
}

fn byte9_shift(pos: Unsigned3Bit) -> Result<u32, ConversionFailed> {
    let pos = u32::from(pos);
    if pos >= u32::from(BYTES_PER_WORD) {
        Err(ConversionFailed::TooLarge)
    } else {
        Ok(27 - 9 * pos)
    }
}

/// Bit offset (from the most significant end of the word) of the
/// 6-bit character at position `pos`.  Position 0 is the leftmost
/// character.
pub fn char6_bit_offset(pos: Unsigned3Bit) -> Result<Unsigned6Bit, ConversionFailed> {
    char6_shift(pos)?;
    Unsigned6Bit::try_from(6 * u8::from(pos))
}

/// Bit offset (from the most significant end of the word) of the
/// 9-bit byte at position `pos`.
pub fn byte9_bit_offset(pos: Unsigned3Bit) -> Result<Unsigned6Bit, ConversionFailed> {
    byte9_shift(pos)?;
    Unsigned6Bit::try_from(9 * u8::from(pos))
}

/// Get the 6-bit character at position `pos` (0-5, leftmost first).
pub fn char6(word: Unsigned36Bit, pos: Unsigned3Bit) -> Result<Unsigned6Bit, ConversionFailed> {
    Ok(field(word, char6_shift(pos)?))
}

/// Replace the 6-bit character at position `pos`.
pub fn put_char6(
    word: Unsigned36Bit,
    pos: Unsigned3Bit,
    ch: Unsigned6Bit,
) -> Result<Unsigned36Bit, ConversionFailed> {
    Ok(deposit(word, char6_shift(pos)?, ch))
}

/// Get the 9-bit byte at position `pos` (0-3, leftmost first).
pub fn byte9(word: Unsigned36Bit, pos: Unsigned3Bit) -> Result<Unsigned9Bit, ConversionFailed> {
    Ok(field(word, byte9_shift(pos)?))
}

/// Replace the 9-bit byte at position `pos`.
pub fn put_byte9(
    word: Unsigned36Bit,
    pos: Unsigned3Bit,
    byte: Unsigned9Bit,
) -> Result<Unsigned36Bit, ConversionFailed> {
    Ok(deposit(word, byte9_shift(pos)?, byte))
}
