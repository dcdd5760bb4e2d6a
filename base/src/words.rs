//! Formats of the words which the address modifier fetches while
//! following an indirect chain.
//!
//! Each format is a thin wrapper around the raw word.  Updating a
//! field returns a new word with only that field changed, so that
//! writing a tally word back to memory preserves every bit we do not
//! own.
use std::fmt::{self, Debug, Formatter};

use super::subword;
use super::tag::Tag;
use super::types::{Ring, SegmentNumber, Tally};
use super::unsigned::{Unsigned18Bit, Unsigned36Bit, Unsigned3Bit, Unsigned6Bit};

const TALLY_SHIFT: u32 = 6;
const CHARACTER_SIZE_BIT: u32 = 5;

/// A plain indirect word: an address and a tag.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IndirectWord(Unsigned36Bit);

impl IndirectWord {
    pub fn address(&self) -> Unsigned18Bit {
        subword::upper_half(self.0)
    }

    pub fn tag(&self) -> Tag {
        Tag::new(subword::field(self.0, 0))
    }

    pub fn bits(&self) -> Unsigned36Bit {
        self.0
    }
}

impl From<Unsigned36Bit> for IndirectWord {
    fn from(w: Unsigned36Bit) -> IndirectWord {
        IndirectWord(w)
    }
}

impl Debug for IndirectWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "IndirectWord({:06o},{})", self.address(), self.tag())
    }
}

/// The word used by the `ad`, `sd`, `di`, `id`, `dic` and `idc`
/// modifiers.  Bits 0-5 are the delta for `ad` and `sd`, and the
/// continuation tag for `dic` and `idc`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TallyWord(Unsigned36Bit);

impl TallyWord {
    pub fn address(&self) -> Unsigned18Bit {
        subword::upper_half(self.0)
    }

    pub fn tally(&self) -> Tally {
        subword::field(self.0, TALLY_SHIFT)
    }

    pub fn delta(&self) -> Unsigned6Bit {
        subword::field(self.0, 0)
    }

    /// The same bits as [`TallyWord::delta`], read as a tag.
    pub fn tag(&self) -> Tag {
        Tag::new(self.delta())
    }

    #[must_use]
    pub fn with_address(&self, address: Unsigned18Bit) -> TallyWord {
        TallyWord(subword::deposit(self.0, 18, address))
    }

    #[must_use]
    pub fn with_tally(&self, tally: Tally) -> TallyWord {
        TallyWord(subword::deposit(self.0, TALLY_SHIFT, tally))
    }

    pub fn bits(&self) -> Unsigned36Bit {
        self.0
    }
}

impl From<Unsigned36Bit> for TallyWord {
    fn from(w: Unsigned36Bit) -> TallyWord {
        TallyWord(w)
    }
}

impl Debug for TallyWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TallyWord{{address: {:06o}, tally: {:04o}, delta: {:02o}}}",
            self.address(),
            self.tally(),
            self.delta()
        )
    }
}

/// The character size selected by the TB bit of a character tally
/// word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterSize {
    /// Six 6-bit characters per word.
    Six,
    /// Four 9-bit bytes per word.
    Nine,
}

impl CharacterSize {
    pub fn chars_per_word(&self) -> u8 {
        match self {
            CharacterSize::Six => subword::CHARS_PER_WORD,
            CharacterSize::Nine => subword::BYTES_PER_WORD,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            CharacterSize::Six => 6,
            CharacterSize::Nine => 9,
        }
    }
}

/// The word used by the `ci`, `sc` and `scr` modifiers.  Bits 3 and
/// 4 have no meaning to the modifier but are preserved.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CharacterTallyWord(Unsigned36Bit);

impl CharacterTallyWord {
    pub fn address(&self) -> Unsigned18Bit {
        subword::upper_half(self.0)
    }

    pub fn tally(&self) -> Tally {
        subword::field(self.0, TALLY_SHIFT)
    }

    pub fn size(&self) -> CharacterSize {
        if subword::bit(self.0, CHARACTER_SIZE_BIT) {
            CharacterSize::Nine
        } else {
            CharacterSize::Six
        }
    }

    /// The character position (CF).  Position 0 is the leftmost
    /// character of the word.
    pub fn position(&self) -> Unsigned3Bit {
        subword::field(self.0, 0)
    }

    /// True if the character position is within the word for the
    /// selected character size.
    pub fn position_is_valid(&self) -> bool {
        u8::from(self.position()) < self.size().chars_per_word()
    }

    #[must_use]
    pub fn with_address(&self, address: Unsigned18Bit) -> CharacterTallyWord {
        CharacterTallyWord(subword::deposit(self.0, 18, address))
    }

    #[must_use]
    pub fn with_tally(&self, tally: Tally) -> CharacterTallyWord {
        CharacterTallyWord(subword::deposit(self.0, TALLY_SHIFT, tally))
    }

    #[must_use]
    pub fn with_position(&self, position: Unsigned3Bit) -> CharacterTallyWord {
        CharacterTallyWord(subword::deposit(self.0, 0, position))
    }

    pub fn bits(&self) -> Unsigned36Bit {
        self.0
    }
}

impl From<Unsigned36Bit> for CharacterTallyWord {
    fn from(w: Unsigned36Bit) -> CharacterTallyWord {
        CharacterTallyWord(w)
    }
}

impl Debug for CharacterTallyWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CharacterTallyWord{{address: {:06o}, tally: {:04o}, size: {:?}, position: {}}}",
            self.address(),
            self.tally(),
            self.size(),
            self.position()
        )
    }
}

/// The odd word of a pointer pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerTarget {
    pub word_number: Unsigned18Bit,
    pub bit_number: Unsigned6Bit,
    /// Modification to apply after the pointer has been followed.
    pub tag: Tag,
}

impl From<Unsigned36Bit> for PointerTarget {
    fn from(w: Unsigned36Bit) -> PointerTarget {
        PointerTarget {
            word_number: subword::upper_half(w),
            bit_number: subword::field(w, 9),
            tag: Tag::new(subword::field(w, 0)),
        }
    }
}

impl From<&PointerTarget> for Unsigned36Bit {
    fn from(t: &PointerTarget) -> Unsigned36Bit {
        let w = subword::join_halves(t.word_number, Unsigned18Bit::ZERO);
        let w = subword::deposit(w, 9, t.bit_number);
        subword::deposit(w, 0, t.tag.bits())
    }
}

/// A decoded pointer pair: two words at an even/odd address whose
/// even word is tagged `its` or `itp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPair {
    /// Indirect to segment.
    Segment {
        segment: SegmentNumber,
        ring: Ring,
        target: PointerTarget,
    },
    /// Indirect to pointer register.
    PointerRegister {
        register: Unsigned3Bit,
        target: PointerTarget,
    },
}

impl PointerPair {
    /// Decode a pointer pair.  Returns `None` if the even word is not
    /// tagged as the first word of a pointer pair.
    pub fn decode(even: Unsigned36Bit, odd: Unsigned36Bit) -> Option<PointerPair> {
        let tag = Tag::new(subword::field(even, 0));
        let target = PointerTarget::from(odd);
        if tag == Tag::ITS {
            Some(PointerPair::Segment {
                segment: subword::field(even, 18),
                ring: subword::field(even, 15),
                target,
            })
        } else if tag == Tag::ITP {
            Some(PointerPair::PointerRegister {
                register: subword::field(even, 33),
                target,
            })
        } else {
            None
        }
    }

    pub fn target(&self) -> &PointerTarget {
        match self {
            PointerPair::Segment { target, .. } | PointerPair::PointerRegister { target, .. } => {
                target
            }
        }
    }

    /// Encode the pair as (even, odd) words.
    pub fn words(&self) -> (Unsigned36Bit, Unsigned36Bit) {
        let even = match self {
            PointerPair::Segment { segment, ring, .. } => {
                let w = subword::deposit(Unsigned36Bit::ZERO, 18, *segment);
                let w = subword::deposit(w, 15, *ring);
                subword::deposit(w, 0, Tag::ITS.bits())
            }
            PointerPair::PointerRegister { register, .. } => {
                let w = subword::deposit(Unsigned36Bit::ZERO, 33, *register);
                subword::deposit(w, 0, Tag::ITP.bits())
            }
        };
        (even, Unsigned36Bit::from(self.target()))
    }
}
