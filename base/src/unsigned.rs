//! Fixed-width unsigned machine quantities.
//!
//! The processor works on a 36-bit word, but almost every register
//! and descriptor field is narrower: 3-bit ring numbers, 15-bit
//! segment numbers, 18-bit addresses, 24-bit physical addresses, and
//! so on.  Each of those gets its own type here so that a segment
//! number cannot silently be used where a ring number is expected,
//! and so that arithmetic on (for example) a computed address wraps
//! modulo 2^18 the way the hardware adder does.
//!
//! Each type is stored in the smallest native unsigned integer that
//! can hold it.  The bits above the type's width are always zero.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter, Octal};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::error::ConversionFailed;


/// Operations common to all the fixed-width types, used by the
/// generic field accessors in [`crate::subword`].
pub trait FixedWidth: Copy {
    /// The width of the type, in bits.
    const BITS: u32;

    /// Build a value from the low-order `Self::BITS` bits of `n`;
    /// higher bits are discarded.
    fn truncating_from(n: u64) -> Self;

    /// Widen the value to a native 64-bit integer.
    fn to_u64(self) -> u64;
}

/// This macro implements conversions from native types to
/// Unsigned*Bit which are always possible (e.g. From<u8> for
/// Unsigned9Bit).
macro_rules! from_native_type_to_self {
    ($SelfT:ty, $($from:ty)*) => {
        $(
            impl From<$from> for $SelfT {
                fn from(n: $from) -> Self {
                    Self {
                        bits: n.into(),
                    }
                }
            }
        )*
    }
}

/// This macro implements conversions from Unsigned*Bit to native
/// types which are always possible (e.g. From<Unsigned9Bit> for
/// i16).
macro_rules! from_self_to_native_type {
    ($SelfT:ty, $($to:ty)*) => {
        $(
            impl From<$SelfT> for $to {
                fn from(n: $SelfT) -> $to {
                    // The value always fits, because the width of
                    // $SelfT is less than the width of $to, even
                    // though the inner type of $SelfT may be as wide
                    // as $to (e.g. u16 inside Unsigned9Bit being
                    // converted to i16).
                    n.bits as $to
                }
            }
        )*
    }
}

/// This macro implements conversions from Unsigned*Bit to native
/// types where the conversion may not always fit.  For example
/// TryFrom<Unsigned18Bit> for u8.
macro_rules! try_from_self_to_native_type {
    ($SelfT:ty, $($to:ty)*) => {
        $(
            impl TryFrom<$SelfT> for $to {
                type Error = ConversionFailed;
                fn try_from(n: $SelfT) -> Result<$to, ConversionFailed> {
                    <$to>::try_from(n.bits).map_err(|_| ConversionFailed::TooLarge)
                }
            }
        )*
    }
}

/// This macro implements conversions from native types to
/// Unsigned*Bit where the conversion may not always fit.  For
/// example TryFrom<u64> for Unsigned36Bit.
macro_rules! try_from_native_type_to_self {
    ($SelfT:ty, $InnerT:ty, $($from:ty)*) => {
        $(
            impl TryFrom<$from> for $SelfT {
                type Error = ConversionFailed;
                fn try_from(n: $from) -> Result<Self, ConversionFailed> {
                    let bits: $InnerT = match n.try_into() {
                        Err(_) => {
                            // $InnerT is unsigned, so n < 0 is
                            // always an error.  For unsigned $from
                            // the comparison is always false.
                            #[allow(unused_comparisons)]
                            if n < 0 {
                                return Err(ConversionFailed::TooSmall);
                            } else {
                                return Err(ConversionFailed::TooLarge);
                            }
                        }
                        Ok(value) if value > Self::VALUE_BITS => {
                            return Err(ConversionFailed::TooLarge);
                        }
                        Ok(value) => value,
                    };
                    Ok(Self { bits })
                }
            }
        )*
    }
}

/// Lossless conversion from a narrower fixed-width type to wider ones.
macro_rules! widen {
    ($FromT:ty => $($to:ty)*) => {
        $(
            impl From<$FromT> for $to {
                fn from(n: $FromT) -> $to {
                    Self {
                        bits: n.bits.into(),
                    }
                }
            }
        )*
    }
}

/// Fallible conversion from a wider fixed-width type to narrower
/// ones.
macro_rules! narrow {
    ($FromT:ty => $($to:ty)*) => {
        $(
            impl TryFrom<$FromT> for $to {
                type Error = ConversionFailed;
                fn try_from(n: $FromT) -> Result<$to, ConversionFailed> {
                    <$to>::try_from(n.bits)
                }
            }
        )*
    }
}

/// This macro implements the base functionality of the unsigned
/// types.  `SelfT` is the name of the type we are defining, `BITS`
/// is its width and `InnerT` is the native type which stores those
/// bits.
macro_rules! unsigned_word_impl {
    ($SelfT:ty, $BITS:expr, $InnerT:ty) => {
        impl $SelfT {
            pub(crate) const MODULUS: u64 = (1 << $BITS);
            pub(crate) const VALUE_BITS: $InnerT = (Self::MODULUS - 1) as $InnerT;

            pub const BITS: u32 = $BITS;

            pub const MAX: Self = Self {
                bits: Self::VALUE_BITS,
            };

            pub const ZERO: Self = Self { bits: 0 };
            pub const ONE: Self = Self { bits: 1 };
            pub const MIN: Self = Self::ZERO;

            // This will always fail at compile time for an
            // out-of-range value.  It's pub so that it can be used
            // in u36!() and similar.
            pub const fn new<const N: $InnerT>() -> $SelfT {
                type Word = $SelfT;
                struct Helper<const M: $InnerT>;
                impl<const M: $InnerT> Helper<M> {
                    const U: Word = {
                        if M > Word::MAX.bits {
                            panic!("input value is out of range")
                        } else {
                            Word { bits: M }
                        }
                    };
                }
                Helper::<N>::U
            }

            pub const fn is_zero(&self) -> bool {
                self.bits == 0
            }

            pub fn wrapping_add(self, rhs: $SelfT) -> $SelfT {
                let sum: u64 = (self.bits as u64) + (rhs.bits as u64);
                Self {
                    bits: (sum % Self::MODULUS) as $InnerT,
                }
            }

            pub fn wrapping_sub(self, rhs: $SelfT) -> $SelfT {
                let difference: u64 = (self.bits as u64) + Self::MODULUS - (rhs.bits as u64);
                Self {
                    bits: (difference % Self::MODULUS) as $InnerT,
                }
            }

            /// Add, reporting whether the result wrapped.
            pub fn overflowing_add(self, rhs: $SelfT) -> ($SelfT, bool) {
                let sum: u64 = (self.bits as u64) + (rhs.bits as u64);
                (
                    Self {
                        bits: (sum % Self::MODULUS) as $InnerT,
                    },
                    sum >= Self::MODULUS,
                )
            }

            pub fn checked_add(self, rhs: $SelfT) -> Option<$SelfT> {
                match self.overflowing_add(rhs) {
                    (sum, false) => Some(sum),
                    (_, true) => None,
                }
            }

            pub fn checked_sub(self, rhs: $SelfT) -> Option<$SelfT> {
                self.bits
                    .checked_sub(rhs.bits)
                    .map(|bits| Self { bits })
            }

            pub fn successor(self) -> $SelfT {
                self.wrapping_add(Self::ONE)
            }

            pub fn predecessor(self) -> $SelfT {
                self.wrapping_sub(Self::ONE)
            }

            // We cannot call std::ops::BitAnd in a const because
            // trait methods cannot be const.  So we have this
            // work-alike in impl, since it can be called in a const
            // context.
            pub const fn and(self, mask: $InnerT) -> Self {
                Self {
                    bits: self.bits & mask,
                }
            }

            pub const fn bitor(self, mask: $InnerT) -> Self {
                Self {
                    bits: (self.bits | mask) & Self::VALUE_BITS,
                }
            }
        }

        impl FixedWidth for $SelfT {
            const BITS: u32 = $BITS;

            fn truncating_from(n: u64) -> Self {
                Self {
                    bits: (n % Self::MODULUS) as $InnerT,
                }
            }

            fn to_u64(self) -> u64 {
                self.bits as u64
            }
        }

        impl Default for $SelfT {
            fn default() -> Self {
                Self { bits: 0 }
            }
        }

        #[cfg(test)]
        impl proptest::arbitrary::Arbitrary for $SelfT {
            type Parameters = ();
            type Strategy = proptest::strategy::Map<
                std::ops::RangeInclusive<$InnerT>,
                fn($InnerT) -> $SelfT,
            >;

            fn arbitrary_with(_args: ()) -> Self::Strategy {
                use proptest::strategy::Strategy;
                let make: fn($InnerT) -> $SelfT = |bits| Self { bits };
                (0..=Self::VALUE_BITS).prop_map(make)
            }
        }

        impl Display for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Octal for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Debug for $SelfT {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, concat!(stringify!($SelfT), "{{bits: {:#o}}}"), self.bits)
            }
        }

        impl Hash for $SelfT {
            fn hash<H>(&self, state: &mut H)
            where
                H: Hasher,
            {
                self.bits.hash(state)
            }
        }

        impl<T> PartialEq<T> for $SelfT
        where
            T: TryInto<$SelfT> + Copy,
        {
            fn eq(&self, other: &T) -> bool {
                let converted: Result<$SelfT, _> = (*other).try_into();
                match converted {
                    Ok(rhs) => self.bits == rhs.bits,
                    Err(_) => false,
                }
            }
        }

        impl Eq for $SelfT {}

        impl PartialOrd<$SelfT> for $SelfT {
            fn partial_cmp(&self, other: &$SelfT) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl PartialOrd<u32> for $SelfT {
            fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
                match <$SelfT>::try_from(*other) {
                    Ok(value) => Some(self.cmp(&value)),
                    // The error case tells us that `other` doesn't
                    // fit into $SelfT, so `other` must be greater.
                    Err(_) => Some(Ordering::Less),
                }
            }
        }

        impl Ord for $SelfT {
            fn cmp(&self, other: &$SelfT) -> Ordering {
                self.bits.cmp(&other.bits)
            }
        }

        impl std::ops::Not for $SelfT {
            type Output = Self;
            fn not(self) -> Self {
                Self {
                    bits: (!self.bits) & Self::VALUE_BITS,
                }
            }
        }

        impl std::ops::BitAnd<$InnerT> for $SelfT {
            type Output = Self;
            fn bitand(self, mask: $InnerT) -> Self {
                Self {
                    bits: self.bits & mask,
                }
            }
        }

        impl std::ops::BitAnd<$SelfT> for $SelfT {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self {
                    bits: self.bits & rhs.bits,
                }
            }
        }

        impl std::ops::BitOr<$InnerT> for $SelfT {
            type Output = Self;
            fn bitor(self, mask: $InnerT) -> Self {
                Self {
                    bits: (self.bits | mask) & Self::VALUE_BITS,
                }
            }
        }

        impl std::ops::BitOr for $SelfT {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.bitor(rhs.bits)
            }
        }

        impl std::ops::BitXor for $SelfT {
            type Output = Self;
            fn bitxor(self, rhs: Self) -> Self {
                Self {
                    bits: self.bits ^ rhs.bits,
                }
            }
        }

        /// Logical (not circular) right shift.
        impl std::ops::Shr<u32> for $SelfT {
            type Output = $SelfT;
            fn shr(self, shift_by: u32) -> Self {
                if shift_by >= $BITS {
                    Self::ZERO
                } else {
                    Self {
                        bits: self.bits >> shift_by,
                    }
                }
            }
        }

        /// Logical (not circular) left shift; bits shifted out of
        /// the top of the word are lost.
        impl std::ops::Shl<u32> for $SelfT {
            type Output = $SelfT;
            fn shl(self, shift_by: u32) -> Self {
                if shift_by >= $BITS {
                    Self::ZERO
                } else {
                    Self::truncating_from((self.bits as u64) << shift_by)
                }
            }
        }
    };
}

/// `Unsigned2Bit` holds the fault code (directed fault number) of
/// segment and page descriptors.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned2Bit {
    pub(crate) bits: u8,
}

/// `Unsigned3Bit` holds ring numbers, pointer-register numbers and
/// character positions.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned3Bit {
    pub(crate) bits: u8,
}

/// `Unsigned4Bit` is the designator (Td) part of a tag.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned4Bit {
    pub(crate) bits: u8,
}

/// `Unsigned6Bit` holds a complete tag, a tally-word delta or a bit
/// offset within a word.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned6Bit {
    pub(crate) bits: u8,
}

/// `Unsigned9Bit` holds a 9-bit byte, and the base and bound fields
/// of the base-address register.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned9Bit {
    pub(crate) bits: u16,
}

/// `Unsigned12Bit` is the tally field of a tally word, and the stack
/// base of the descriptor segment base register.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned12Bit {
    pub(crate) bits: u16,
}

/// `Unsigned14Bit` is the bound (in 16-word blocks) and call limiter
/// of a segment descriptor, and the bound of the descriptor segment.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned14Bit {
    pub(crate) bits: u16,
}

/// `Unsigned15Bit` is a segment number.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned15Bit {
    pub(crate) bits: u16,
}

/// `Unsigned18Bit` is half of a machine word.  Computed addresses,
/// index registers and offsets within a segment all have this width.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned18Bit {
    pub(crate) bits: u32,
}

/// `Unsigned24Bit` is an absolute (physical) memory address.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned24Bit {
    pub(crate) bits: u32,
}

/// `Unsigned36Bit` is the machine word.
#[derive(Clone, Copy, Serialize)]
pub struct Unsigned36Bit {
    pub(crate) bits: u64,
}

unsigned_word_impl!(Unsigned2Bit, 2, u8);
unsigned_word_impl!(Unsigned3Bit, 3, u8);
unsigned_word_impl!(Unsigned4Bit, 4, u8);
unsigned_word_impl!(Unsigned6Bit, 6, u8);
unsigned_word_impl!(Unsigned9Bit, 9, u16);
unsigned_word_impl!(Unsigned12Bit, 12, u16);
unsigned_word_impl!(Unsigned14Bit, 14, u16);
unsigned_word_impl!(Unsigned15Bit, 15, u16);
unsigned_word_impl!(Unsigned18Bit, 18, u32);
unsigned_word_impl!(Unsigned24Bit, 24, u32);
unsigned_word_impl!(Unsigned36Bit, 36, u64);

////////////////////////////////////////////////////////////////////////
// Types stored in a u8
////////////////////////////////////////////////////////////////////////

from_self_to_native_type!(Unsigned2Bit, u8 i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned2Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);

from_self_to_native_type!(Unsigned3Bit, u8 i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned3Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);

from_self_to_native_type!(Unsigned4Bit, u8 i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned4Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);

from_self_to_native_type!(Unsigned6Bit, u8 i8 u16 i16 u32 i32 u64 i64 usize isize);
try_from_native_type_to_self!(Unsigned6Bit, u8, i8 u8 u16 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Types stored in a u16
////////////////////////////////////////////////////////////////////////

from_native_type_to_self!(Unsigned9Bit, u8);
from_self_to_native_type!(Unsigned9Bit, u16 i16 u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned9Bit, u8 i8);
try_from_native_type_to_self!(Unsigned9Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);

from_native_type_to_self!(Unsigned12Bit, u8);
from_self_to_native_type!(Unsigned12Bit, u16 i16 u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned12Bit, u8 i8);
try_from_native_type_to_self!(Unsigned12Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);

from_native_type_to_self!(Unsigned14Bit, u8);
from_self_to_native_type!(Unsigned14Bit, u16 i16 u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned14Bit, u8 i8);
try_from_native_type_to_self!(Unsigned14Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);

from_native_type_to_self!(Unsigned15Bit, u8);
from_self_to_native_type!(Unsigned15Bit, u16 i16 u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned15Bit, u8 i8);
try_from_native_type_to_self!(Unsigned15Bit, u16, i8 u16 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Types stored in a u32
////////////////////////////////////////////////////////////////////////

from_native_type_to_self!(Unsigned18Bit, u8 u16);
from_self_to_native_type!(Unsigned18Bit, u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned18Bit, u8 i8 u16 i16);
try_from_native_type_to_self!(Unsigned18Bit, u32, i8 i16 u32 i32 u64 i64 usize isize);

from_native_type_to_self!(Unsigned24Bit, u8 u16);
from_self_to_native_type!(Unsigned24Bit, u32 i32 u64 i64 usize isize);
try_from_self_to_native_type!(Unsigned24Bit, u8 i8 u16 i16);
try_from_native_type_to_self!(Unsigned24Bit, u32, i8 i16 u32 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Unsigned36Bit
////////////////////////////////////////////////////////////////////////

from_native_type_to_self!(Unsigned36Bit, u8 u16 u32);
from_self_to_native_type!(Unsigned36Bit, u64 i64);
try_from_self_to_native_type!(Unsigned36Bit, u8 i8 u16 i16 u32 i32 usize isize);
try_from_native_type_to_self!(Unsigned36Bit, u64, i8 i16 i32 u64 i64 usize isize);

////////////////////////////////////////////////////////////////////////
// Conversions between the fixed-width types
////////////////////////////////////////////////////////////////////////

widen!(Unsigned2Bit => Unsigned3Bit Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned3Bit => Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned4Bit => Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned6Bit => Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned9Bit => Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned12Bit => Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned14Bit => Unsigned15Bit Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned15Bit => Unsigned18Bit Unsigned24Bit Unsigned36Bit);
widen!(Unsigned18Bit => Unsigned24Bit Unsigned36Bit);
widen!(Unsigned24Bit => Unsigned36Bit);

narrow!(Unsigned36Bit => Unsigned2Bit Unsigned3Bit Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit Unsigned24Bit);
narrow!(Unsigned24Bit => Unsigned2Bit Unsigned3Bit Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit Unsigned18Bit);
narrow!(Unsigned18Bit => Unsigned2Bit Unsigned3Bit Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit Unsigned15Bit);
narrow!(Unsigned15Bit => Unsigned2Bit Unsigned3Bit Unsigned4Bit Unsigned6Bit Unsigned9Bit Unsigned12Bit Unsigned14Bit);
narrow!(Unsigned6Bit => Unsigned2Bit Unsigned3Bit Unsigned4Bit);
narrow!(Unsigned4Bit => Unsigned2Bit Unsigned3Bit);
