//! Binary representation of instruction words.
//!
//! An instruction occupies 36 bits.  The fields look like this
//! (least significant bit on the right, bits numbered 0 to 35 in
//! decimal):
//!
//! | Address (Y) | Opcode | Opcode extension | I     | A     | Tag    |
//! |-------------|--------|------------------|-------|-------|--------|
//! | 18 bits     | 9 bits | 1 bit            | 1 bit | 1 bit | 6 bits |
//! | (18-35)     | (9-17) | (8)              | (7)   | (6)   | (0-5)  |
//!
//! I is the interrupt-inhibit bit.  When A is set, the address field
//! does not hold an address but a pointer-register number (the top 3
//! bits of Y) and a 15-bit two's-complement offset (the rest).  The
//! operand is then found relative to the pointer register.

use std::fmt::{self, Debug, Display, Formatter};

#[cfg(test)]
use test_strategy::{proptest, Arbitrary};

use super::subword;
use super::tag::Tag;
use super::unsigned::{
    FixedWidth, Unsigned15Bit, Unsigned18Bit, Unsigned36Bit, Unsigned3Bit, Unsigned6Bit,
    Unsigned9Bit,
};

const OPCODE_EXTENSION_BIT: u32 = 8;
const INTERRUPT_INHIBIT_BIT: u32 = 7;
const POINTER_REGISTER_BIT: u32 = 6;

/// An instruction word.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Instruction(Unsigned36Bit);

impl Instruction {
    pub fn bits(&self) -> Unsigned36Bit {
        self.0
    }

    /// The address field, Y.
    pub fn address(&self) -> Unsigned18Bit {
        subword::upper_half(self.0)
    }

    pub fn opcode(&self) -> Unsigned9Bit {
        subword::field(self.0, 9)
    }

    pub fn opcode_extension(&self) -> bool {
        subword::bit(self.0, OPCODE_EXTENSION_BIT)
    }

    pub fn interrupt_inhibit(&self) -> bool {
        subword::bit(self.0, INTERRUPT_INHIBIT_BIT)
    }

    /// The A bit: when set, the address is relative to a pointer
    /// register.
    pub fn is_pointer_register_relative(&self) -> bool {
        subword::bit(self.0, POINTER_REGISTER_BIT)
    }

    pub fn tag(&self) -> Tag {
        Tag::new(subword::field::<Unsigned6Bit>(self.0, 0))
    }

    /// When the A bit is set, the pointer register number and offset
    /// encoded in the address field.
    pub fn pointer_register_address(&self) -> Option<PointerRegisterAddress> {
        if self.is_pointer_register_relative() {
            Some(PointerRegisterAddress::from(self.address()))
        } else {
            None
        }
    }
}

impl From<Unsigned36Bit> for Instruction {
    fn from(w: Unsigned36Bit) -> Instruction {
        Instruction(w)
    }
}

impl From<Instruction> for Unsigned36Bit {
    fn from(inst: Instruction) -> Unsigned36Bit {
        inst.0
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:012o})", self.0)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // The conventional listing format: address, opcode and the
        // modifier in assembler notation.
        write!(
            f,
            "{:06o} {:03o}{} {}",
            self.address(),
            self.opcode(),
            if self.is_pointer_register_relative() {
                " (pr)"
            } else {
                ""
            },
            self.tag()
        )
    }
}

/// The address field of an instruction whose A bit is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerRegisterAddress {
    pub register: Unsigned3Bit,
    /// Two's-complement offset, 15 bits wide.
    pub offset: Unsigned15Bit,
}

impl PointerRegisterAddress {
    /// The offset sign-extended to 18 bits, so that adding it to a
    /// word number (modulo 2^18) applies the signed offset.
    pub fn offset_as_18_bits(&self) -> Unsigned18Bit {
        let bits = u32::from(self.offset);
        let extended = if bits & 0o40_000 != 0 {
            bits | 0o700_000
        } else {
            bits
        };
        Unsigned18Bit::truncating_from(u64::from(extended))
    }

    /// The offset as a native signed integer.
    pub fn signed_offset(&self) -> i32 {
        let bits = i32::from(self.offset);
        if bits & 0o40_000 != 0 {
            bits - 0o100_000
        } else {
            bits
        }
    }
}

impl From<Unsigned18Bit> for PointerRegisterAddress {
    fn from(y: Unsigned18Bit) -> PointerRegisterAddress {
        let bits = u64::from(y);
        PointerRegisterAddress {
            register: Unsigned3Bit::truncating_from(bits >> 15),
            offset: Unsigned15Bit::truncating_from(bits),
        }
    }
}

/// An instruction broken down into its component fields.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstructionFields {
    pub address: Unsigned18Bit,
    pub opcode: Unsigned9Bit,
    pub opcode_extension: bool,
    pub interrupt_inhibit: bool,
    pub pointer_register: bool,
    pub tag: Unsigned6Bit,
}

impl From<&InstructionFields> for Instruction {
    fn from(f: &InstructionFields) -> Instruction {
        let mut w = subword::join_halves(f.address, Unsigned18Bit::ZERO);
        w = subword::deposit(w, 9, f.opcode);
        w = subword::with_bit(w, OPCODE_EXTENSION_BIT, f.opcode_extension);
        w = subword::with_bit(w, INTERRUPT_INHIBIT_BIT, f.interrupt_inhibit);
        w = subword::with_bit(w, POINTER_REGISTER_BIT, f.pointer_register);
        w = subword::deposit(w, 0, f.tag);
        Instruction(w)
    }
}

impl From<&Instruction> for InstructionFields {
    fn from(inst: &Instruction) -> InstructionFields {
        InstructionFields {
            address: inst.address(),
            opcode: inst.opcode(),
            opcode_extension: inst.opcode_extension(),
            interrupt_inhibit: inst.interrupt_inhibit(),
            pointer_register: inst.is_pointer_register_relative(),
            tag: inst.tag().bits(),
        }
    }
}

#[cfg(test)]
#[proptest]
fn reversible_field_decomposition(input: InstructionFields) {
    let inst: Instruction = Instruction::from(&input);
    assert_eq!(InstructionFields::from(&inst), input, "assembled to {inst:?}");
}
