//! Arithmetic of the indirect-then-tally modifiers.
//!
//! Everything here is a pure function of the designator and the
//! fetched word; reading the word, writing it back and setting the
//! tally-runout indicator are done by the caller.
use base::prelude::*;
use base::subword;

/// One character (or byte) of a word, as selected by a character
/// tally word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSelector {
    pub size: CharacterSize,
    /// Position 0 is the leftmost character of the word.
    pub position: Unsigned3Bit,
}

impl CharacterSelector {
    /// Offset of the character from the most significant end of the
    /// word, as held in TBR.
    pub fn bit_offset(&self) -> Result<Unsigned6Bit, ConversionFailed> {
        match self.size {
            CharacterSize::Six => subword::char6_bit_offset(self.position),
            CharacterSize::Nine => subword::byte9_bit_offset(self.position),
        }
    }

    /// The selected character, right-justified.
    pub fn extract(&self, word: Unsigned36Bit) -> Result<Unsigned36Bit, ConversionFailed> {
        Ok(match self.size {
            CharacterSize::Six => Unsigned36Bit::from(subword::char6(word, self.position)?),
            CharacterSize::Nine => Unsigned36Bit::from(subword::byte9(word, self.position)?),
        })
    }

    /// Replace the selected character of `word` with the low-order
    /// bits of `value`.
    pub fn insert(
        &self,
        word: Unsigned36Bit,
        value: Unsigned36Bit,
    ) -> Result<Unsigned36Bit, ConversionFailed> {
        match self.size {
            CharacterSize::Six => {
                subword::put_char6(word, self.position, subword::field(value, 0))
            }
            CharacterSize::Nine => {
                subword::put_byte9(word, self.position, subword::field(value, 0))
            }
        }
    }
}

/// What an IT modifier does with the word it fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TallyStep {
    pub effective_address: WordAddress,
    pub character: Option<CharacterSelector>,
    /// The updated word to store back where it was fetched from.
    pub rewrite: Option<Unsigned36Bit>,
    /// The new tally, which decides the tally-runout indicator.
    pub tally: Option<Tally>,
    /// For `idc` and `dic`, the modification to continue with.
    pub continuation: Option<Tag>,
}

impl TallyStep {
    fn terminal(effective_address: WordAddress) -> TallyStep {
        TallyStep {
            effective_address,
            character: None,
            rewrite: None,
            tally: None,
            continuation: None,
        }
    }
}

/// Continuation tags of `idc` and `dic` may not name a register.
pub(crate) fn without_register(tag: Tag) -> Tag {
    match tag.tm() {
        ModifierType::IndirectTally => tag,
        _ => Tag::new(tag.bits().and(0o60)),
    }
}

fn next_character(w: CharacterTallyWord) -> (WordAddress, Unsigned3Bit) {
    let next = u8::from(w.position()) + 1;
    if next >= w.size().chars_per_word() {
        (w.address().successor(), Unsigned3Bit::ZERO)
    } else {
        (w.address(), Unsigned3Bit::truncating_from(u64::from(next)))
    }
}

fn previous_character(w: CharacterTallyWord) -> (WordAddress, Unsigned3Bit) {
    match u8::from(w.position()) {
        0 => (
            w.address().predecessor(),
            Unsigned3Bit::truncating_from(u64::from(w.size().chars_per_word() - 1)),
        ),
        n => (w.address(), Unsigned3Bit::truncating_from(u64::from(n - 1))),
    }
}

fn character_step(
    it: IndirectTallyDesignator,
    word: Unsigned36Bit,
) -> Option<TallyStep> {
    let w = CharacterTallyWord::from(word);
    let select = |position| {
        Some(CharacterSelector {
            size: w.size(),
            position,
        })
    };
    match it {
        IndirectTallyDesignator::Ci => Some(TallyStep {
            character: select(w.position()),
            ..TallyStep::terminal(w.address())
        }),
        IndirectTallyDesignator::Sc => {
            let (address, position) = next_character(w);
            let tally = w.tally().predecessor();
            Some(TallyStep {
                effective_address: w.address(),
                character: select(w.position()),
                rewrite: Some(
                    w.with_address(address)
                        .with_position(position)
                        .with_tally(tally)
                        .bits(),
                ),
                tally: Some(tally),
                continuation: None,
            })
        }
        IndirectTallyDesignator::Scr => {
            let (address, position) = previous_character(w);
            let tally = w.tally().successor();
            Some(TallyStep {
                effective_address: address,
                character: select(position),
                rewrite: Some(
                    w.with_address(address)
                        .with_position(position)
                        .with_tally(tally)
                        .bits(),
                ),
                tally: Some(tally),
                continuation: None,
            })
        }
        _ => None,
    }
}

/// Work out the effect of IT designator `it` on the fetched `word`.
/// Returns `None` for the designators which do not fetch a tally or
/// indirect word (the fault tags and the pointer-pair tags).
///
/// The character position of a character tally word must already
/// have been checked.
pub(crate) fn step(it: IndirectTallyDesignator, word: Unsigned36Bit) -> Option<TallyStep> {
    if it.is_character() {
        return character_step(it, word);
    }
    let w = TallyWord::from(word);
    let address = w.address();
    let one = Unsigned18Bit::ONE;
    // (effective address, new address, new tally)
    let (ea, new_address, new_tally) = match it {
        IndirectTallyDesignator::I => return Some(TallyStep::terminal(address)),
        IndirectTallyDesignator::Ad => {
            let delta = Unsigned18Bit::from(w.delta());
            (address, address.wrapping_add(delta), w.tally().predecessor())
        }
        IndirectTallyDesignator::Sd => {
            let moved = address.wrapping_sub(Unsigned18Bit::from(w.delta()));
            (moved, moved, w.tally().successor())
        }
        IndirectTallyDesignator::Id | IndirectTallyDesignator::Idc => {
            (address, address.wrapping_add(one), w.tally().predecessor())
        }
        IndirectTallyDesignator::Di | IndirectTallyDesignator::Dic => {
            let moved = address.wrapping_sub(one);
            (moved, moved, w.tally().successor())
        }
        _ => return None,
    };
    let continuation = match it {
        IndirectTallyDesignator::Idc | IndirectTallyDesignator::Dic => {
            Some(without_register(w.tag()))
        }
        _ => None,
    };
    Some(TallyStep {
        effective_address: ea,
        character: None,
        rewrite: Some(w.with_address(new_address).with_tally(new_tally).bits()),
        tally: Some(new_tally),
        continuation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally_word(address: u32, tally: u16, low: u8) -> Unsigned36Bit {
        let w = subword::join_halves(
            Unsigned18Bit::try_from(address).unwrap(),
            Unsigned18Bit::ZERO,
        );
        let w = subword::deposit(w, 6, Unsigned12Bit::try_from(tally).unwrap());
        subword::deposit(w, 0, Unsigned6Bit::try_from(low).unwrap())
    }

    #[test]
    fn test_ad() {
        let ad = step(IndirectTallyDesignator::Ad, tally_word(0o200, 5, 3)).unwrap();
        assert_eq!(ad.effective_address, u18!(0o200));
        assert_eq!(ad.rewrite, Some(tally_word(0o203, 4, 3)));
        assert_eq!(ad.tally, Some(Unsigned12Bit::try_from(4_u16).unwrap()));
        assert_eq!(ad.continuation, None);
    }

    #[test]
    fn test_sd() {
        let sd = step(IndirectTallyDesignator::Sd, tally_word(0o200, 5, 3)).unwrap();
        assert_eq!(sd.effective_address, u18!(0o175));
        assert_eq!(sd.rewrite, Some(tally_word(0o175, 6, 3)));
    }

    #[test]
    fn test_id_and_di_wrap() {
        let step_id = step(IndirectTallyDesignator::Id, tally_word(0o777_777, 1, 0)).unwrap();
        assert_eq!(step_id.effective_address, u18!(0o777_777));
        assert_eq!(step_id.rewrite, Some(tally_word(0, 0, 0)));
        assert_eq!(step_id.tally, Some(Unsigned12Bit::ZERO));

        let step_di = step(IndirectTallyDesignator::Di, tally_word(0, 0o7777, 0)).unwrap();
        assert_eq!(step_di.effective_address, u18!(0o777_777));
        assert_eq!(step_di.rewrite, Some(tally_word(0o777_777, 0, 0)));
        assert_eq!(step_di.tally, Some(Unsigned12Bit::ZERO));
    }

    #[test]
    fn test_tally_wraps_below_zero() {
        let id = step(IndirectTallyDesignator::Id, tally_word(0o100, 0, 0)).unwrap();
        assert_eq!(id.tally, Some(Unsigned12Bit::MAX));
    }

    #[test]
    fn test_idc_continuation_drops_register() {
        // Continuation tag x3* (RI, X3) becomes n* (RI, no register).
        let idc = step(IndirectTallyDesignator::Idc, tally_word(0o100, 2, 0o33)).unwrap();
        assert_eq!(idc.continuation, Some(Tag::new(Unsigned6Bit::try_from(0o20_u8).unwrap())));
        // An IT continuation is kept as it is.
        let dic = step(IndirectTallyDesignator::Dic, tally_word(0o100, 2, 0o51)).unwrap();
        assert_eq!(dic.continuation, Some(Tag::new(Unsigned6Bit::try_from(0o51_u8).unwrap())));
        assert_eq!(dic.effective_address, u18!(0o77));
    }

    #[test]
    fn test_sc_advances_with_carry() {
        // 6-bit characters, position 5: the next character is the
        // first one of the next word.
        let six = step(IndirectTallyDesignator::Sc, tally_word(0o300, 3, 0o05)).unwrap();
        assert_eq!(six.effective_address, u18!(0o300));
        assert_eq!(
            six.character,
            Some(CharacterSelector {
                size: CharacterSize::Six,
                position: Unsigned3Bit::try_from(5_u8).unwrap(),
            })
        );
        assert_eq!(six.rewrite, Some(tally_word(0o301, 2, 0o00)));

        // 9-bit bytes carry after position 3.  Bits 3 and 4 are
        // preserved.
        let nine = step(IndirectTallyDesignator::Sc, tally_word(0o300, 3, 0o73)).unwrap();
        assert_eq!(nine.rewrite, Some(tally_word(0o301, 2, 0o70)));
    }

    #[test]
    fn test_scr_borrows() {
        let w = tally_word(0o300, 0o7777, 0o40);
        let scr = step(IndirectTallyDesignator::Scr, w).unwrap();
        assert_eq!(scr.effective_address, u18!(0o277));
        assert_eq!(
            scr.character,
            Some(CharacterSelector {
                size: CharacterSize::Nine,
                position: Unsigned3Bit::try_from(3_u8).unwrap(),
            })
        );
        assert_eq!(scr.rewrite, Some(tally_word(0o277, 0, 0o43)));
        assert_eq!(scr.tally, Some(Unsigned12Bit::ZERO));
    }

    #[test]
    fn test_ci_and_i_do_not_rewrite() {
        let ci = step(IndirectTallyDesignator::Ci, tally_word(0o300, 3, 0o02)).unwrap();
        assert_eq!(ci.rewrite, None);
        assert_eq!(ci.tally, None);
        assert_eq!(ci.effective_address, u18!(0o300));
        let i = step(IndirectTallyDesignator::I, tally_word(0o300, 3, 0o02)).unwrap();
        assert_eq!(i, TallyStep::terminal(u18!(0o300)));
    }

    #[test]
    fn test_non_tally_designators() {
        for it in [
            IndirectTallyDesignator::F1,
            IndirectTallyDesignator::F2,
            IndirectTallyDesignator::F3,
            IndirectTallyDesignator::Its,
            IndirectTallyDesignator::Itp,
            IndirectTallyDesignator::Undefined,
        ] {
            assert_eq!(step(it, Unsigned36Bit::ZERO), None);
        }
    }

    #[test]
    fn test_character_selector() {
        let word = u36!(0o012_345_670_123);
        let sel = CharacterSelector {
            size: CharacterSize::Six,
            position: Unsigned3Bit::try_from(2_u8).unwrap(),
        };
        assert_eq!(sel.extract(word), Ok(u36!(0o45)));
        assert_eq!(sel.bit_offset(), Ok(Unsigned6Bit::try_from(12_u8).unwrap()));
        assert_eq!(sel.insert(word, u36!(0o777)), Ok(u36!(0o012_377_670_123)));

        let sel = CharacterSelector {
            size: CharacterSize::Nine,
            position: Unsigned3Bit::try_from(1_u8).unwrap(),
        };
        assert_eq!(sel.extract(word), Ok(u36!(0o345)));
        assert_eq!(sel.insert(word, u36!(0o1_000)), Ok(u36!(0o012_000_670_123)));
    }
}
