//! The 6-bit address-modification tag carried by instruction words
//! and indirect words.
//!
//! The tag is split into a 2-bit modifier type (Tm, bits 4-5) and a
//! 4-bit designator (Td, bits 0-3).  How Td is interpreted depends on
//! Tm: for the R, RI and IR modifiers it names a register, for IT it
//! names one of the indirect-then-tally variants.
use std::fmt::{self, Display, Formatter};

use super::unsigned::{FixedWidth, Unsigned3Bit, Unsigned4Bit, Unsigned6Bit};

/// The modifier type (Tm) field of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierType {
    /// R: register modification.
    Register,
    /// RI: register modification, then indirection.
    RegisterIndirect,
    /// IT: indirection, then tally.
    IndirectTally,
    /// IR: indirection, then register modification.
    IndirectRegister,
}

/// The register designator used by the R, RI and IR modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterDesignator {
    /// No register.
    N,
    /// The upper half of the A register.
    Au,
    /// The upper half of the Q register.
    Qu,
    /// Direct upper: the computed address itself is the operand (in
    /// the upper half of the word).
    Du,
    /// The instruction counter.
    Ic,
    /// The lower half of the A register.
    Al,
    /// The lower half of the Q register.
    Ql,
    /// Direct lower.
    Dl,
    /// An index register.
    X(Unsigned3Bit),
}

impl RegisterDesignator {
    /// True for `du` and `dl`, whose operand is the computed address
    /// and which therefore never access memory.
    pub fn is_direct(&self) -> bool {
        matches!(self, RegisterDesignator::Du | RegisterDesignator::Dl)
    }
}

impl From<Unsigned4Bit> for RegisterDesignator {
    fn from(td: Unsigned4Bit) -> RegisterDesignator {
        match u8::from(td) {
            0 => RegisterDesignator::N,
            1 => RegisterDesignator::Au,
            2 => RegisterDesignator::Qu,
            3 => RegisterDesignator::Du,
            4 => RegisterDesignator::Ic,
            5 => RegisterDesignator::Al,
            6 => RegisterDesignator::Ql,
            7 => RegisterDesignator::Dl,
            n => RegisterDesignator::X(Unsigned3Bit::truncating_from(u64::from(n))),
        }
    }
}

impl From<RegisterDesignator> for Unsigned4Bit {
    fn from(rd: RegisterDesignator) -> Unsigned4Bit {
        let bits: u8 = match rd {
            RegisterDesignator::N => 0,
            RegisterDesignator::Au => 1,
            RegisterDesignator::Qu => 2,
            RegisterDesignator::Du => 3,
            RegisterDesignator::Ic => 4,
            RegisterDesignator::Al => 5,
            RegisterDesignator::Ql => 6,
            RegisterDesignator::Dl => 7,
            RegisterDesignator::X(n) => 0o10 | u8::from(n),
        };
        Unsigned4Bit { bits }
    }
}

impl Display for RegisterDesignator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RegisterDesignator::N => f.write_str("n"),
            RegisterDesignator::Au => f.write_str("au"),
            RegisterDesignator::Qu => f.write_str("qu"),
            RegisterDesignator::Du => f.write_str("du"),
            RegisterDesignator::Ic => f.write_str("ic"),
            RegisterDesignator::Al => f.write_str("al"),
            RegisterDesignator::Ql => f.write_str("ql"),
            RegisterDesignator::Dl => f.write_str("dl"),
            RegisterDesignator::X(n) => write!(f, "x{n}"),
        }
    }
}

/// The designator used by the IT modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndirectTallyDesignator {
    /// Fault tag 1.
    F1,
    /// Indirect to pointer register (only valid in a pointer pair).
    Itp,
    /// Td value 2 is not assigned.
    Undefined,
    /// Indirect to segment (only valid in a pointer pair).
    Its,
    /// Subtract delta.
    Sd,
    /// Sequence character reverse.
    Scr,
    /// Fault tag 2.
    F2,
    /// Fault tag 3.
    F3,
    /// Character indirect.
    Ci,
    /// Indirect.
    I,
    /// Sequence character.
    Sc,
    /// Add delta.
    Ad,
    /// Decrement address, increment tally.
    Di,
    /// Decrement address, increment tally, and continue.
    Dic,
    /// Increment address, decrement tally.
    Id,
    /// Increment address, decrement tally, and continue.
    Idc,
}

const IT_NAMES: [&str; 16] = [
    "f1", "itp", "it2", "its", "sd", "scr", "f2", "f3", "ci", "i", "sc", "ad", "di", "dic", "id",
    "idc",
];

const IT_DESIGNATORS: [IndirectTallyDesignator; 16] = [
    IndirectTallyDesignator::F1,
    IndirectTallyDesignator::Itp,
    IndirectTallyDesignator::Undefined,
    IndirectTallyDesignator::Its,
    IndirectTallyDesignator::Sd,
    IndirectTallyDesignator::Scr,
    IndirectTallyDesignator::F2,
    IndirectTallyDesignator::F3,
    IndirectTallyDesignator::Ci,
    IndirectTallyDesignator::I,
    IndirectTallyDesignator::Sc,
    IndirectTallyDesignator::Ad,
    IndirectTallyDesignator::Di,
    IndirectTallyDesignator::Dic,
    IndirectTallyDesignator::Id,
    IndirectTallyDesignator::Idc,
];

impl IndirectTallyDesignator {
    fn index(&self) -> usize {
        // The discriminants follow the Td encoding.
        *self as usize
    }

    /// True for the variants whose indirect word is a character
    /// tally word.
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            IndirectTallyDesignator::Ci
                | IndirectTallyDesignator::Sc
                | IndirectTallyDesignator::Scr
        )
    }
}

impl From<Unsigned4Bit> for IndirectTallyDesignator {
    fn from(td: Unsigned4Bit) -> IndirectTallyDesignator {
        IT_DESIGNATORS[usize::from(td)]
    }
}

impl From<IndirectTallyDesignator> for Unsigned4Bit {
    fn from(it: IndirectTallyDesignator) -> Unsigned4Bit {
        Unsigned4Bit::truncating_from(it.index() as u64)
    }
}

impl Display for IndirectTallyDesignator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(IT_NAMES[self.index()])
    }
}

/// A fully decoded tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    Register(RegisterDesignator),
    RegisterIndirect(RegisterDesignator),
    IndirectRegister(RegisterDesignator),
    IndirectTally(IndirectTallyDesignator),
}

impl Modifier {
    pub fn modifier_type(&self) -> ModifierType {
        match self {
            Modifier::Register(_) => ModifierType::Register,
            Modifier::RegisterIndirect(_) => ModifierType::RegisterIndirect,
            Modifier::IndirectRegister(_) => ModifierType::IndirectRegister,
            Modifier::IndirectTally(_) => ModifierType::IndirectTally,
        }
    }
}

impl Display for Modifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Register(rd) => write!(f, "{rd}"),
            Modifier::RegisterIndirect(rd) => write!(f, "{rd}*"),
            Modifier::IndirectRegister(rd) => write!(f, "*{rd}"),
            Modifier::IndirectTally(it) => write!(f, "{it}"),
        }
    }
}

/// An address-modification tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tag(Unsigned6Bit);

impl Tag {
    /// The tag of the even word of an indirect-to-pointer-register
    /// pointer pair.
    pub const ITP: Tag = Tag(Unsigned6Bit { bits: 0o41 });
    /// The tag of the even word of an indirect-to-segment pointer
    /// pair.
    pub const ITS: Tag = Tag(Unsigned6Bit { bits: 0o43 });
    /// No modification.
    pub const NONE: Tag = Tag(Unsigned6Bit { bits: 0 });

    pub const fn new(bits: Unsigned6Bit) -> Tag {
        Tag(bits)
    }

    pub fn bits(&self) -> Unsigned6Bit {
        self.0
    }

    /// The modifier-type field (Tm).
    pub fn tm(&self) -> ModifierType {
        match self.0.bits >> 4 {
            0 => ModifierType::Register,
            1 => ModifierType::RegisterIndirect,
            2 => ModifierType::IndirectTally,
            _ => ModifierType::IndirectRegister,
        }
    }

    /// The designator field (Td).
    pub fn td(&self) -> Unsigned4Bit {
        Unsigned4Bit::truncating_from(u64::from(self.0.bits))
    }

    pub fn modifier(&self) -> Modifier {
        let td = self.td();
        match self.tm() {
            ModifierType::Register => Modifier::Register(td.into()),
            ModifierType::RegisterIndirect => Modifier::RegisterIndirect(td.into()),
            ModifierType::IndirectTally => Modifier::IndirectTally(td.into()),
            ModifierType::IndirectRegister => Modifier::IndirectRegister(td.into()),
        }
    }

    /// True if this is the tag of the even word of a pointer pair.
    pub fn is_pointer_pair(&self) -> bool {
        *self == Tag::ITS || *self == Tag::ITP
    }
}

impl From<Unsigned6Bit> for Tag {
    fn from(bits: Unsigned6Bit) -> Tag {
        Tag(bits)
    }
}

impl From<Tag> for Unsigned6Bit {
    fn from(tag: Tag) -> Unsigned6Bit {
        tag.0
    }
}

impl From<Modifier> for Tag {
    fn from(m: Modifier) -> Tag {
        let (tm, td): (u8, Unsigned4Bit) = match m {
            Modifier::Register(rd) => (0, rd.into()),
            Modifier::RegisterIndirect(rd) => (1, rd.into()),
            Modifier::IndirectTally(it) => (2, it.into()),
            Modifier::IndirectRegister(rd) => (3, rd.into()),
        };
        Tag(Unsigned6Bit {
            bits: (tm << 4) | u8::from(td),
        })
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.modifier().fmt(f)
    }
}
