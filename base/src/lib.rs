//! The `base` crate defines the machine-word quantities and formats
//! which are useful both in a processor emulator and in associated
//! tools.  The idea is that if you want to write an assembler or a
//! loader, it would depend on the base crate but would not need to
//! depend on the processor library itself.

mod error;
mod types;
mod unsigned;

pub mod instruction;
pub mod prelude;
pub mod subword;
pub mod tag;
pub mod words;

pub use crate::error::ConversionFailed;
pub use crate::unsigned::*;

#[macro_export]
macro_rules! u36 {
    ($n:expr) => {
        $crate::prelude::Unsigned36Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u18 {
    ($n:expr) => {
        $crate::prelude::Unsigned18Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u24 {
    ($n:expr) => {
        $crate::prelude::Unsigned24Bit::new::<{ $n }>()
    };
}

#[test]
fn test_u36() {
    use prelude::Unsigned36Bit;
    let m: Unsigned36Bit = u36!(40_u64);
    let n: Unsigned36Bit = Unsigned36Bit::from(40_u32);
    assert_eq!(m, n);

    let p: Unsigned36Bit = u36!(1u64 << 34);
    let q: Unsigned36Bit =
        Unsigned36Bit::try_from(1u64 << 34).expect("test data should be in range");
    assert_eq!(p, q);
}

#[test]
fn test_u18() {
    use prelude::Unsigned18Bit;
    let p: Unsigned18Bit = u18!(1 << 17);
    let q: Unsigned18Bit =
        Unsigned18Bit::try_from(1u32 << 17).expect("test data should be in range");
    assert_eq!(p, q);
}

#[test]
fn test_u24() {
    use prelude::PhysicalAddress;
    let p: PhysicalAddress = u24!(0o77_777_777);
    assert_eq!(p, PhysicalAddress::MAX);
}
