//! The prelude exports the word types, field formats and helpers
//! which almost every user of the base crate needs.
pub use super::error::ConversionFailed;
pub use super::instruction::{Instruction, InstructionFields, PointerRegisterAddress};
pub use super::subword::{join_halves, lower_half, split_halves, upper_half};
pub use super::tag::{
    IndirectTallyDesignator, Modifier, ModifierType, RegisterDesignator, Tag,
};
pub use super::types::*;
pub use super::unsigned::*;
pub use super::words::{
    CharacterSize, CharacterTallyWord, IndirectWord, PointerPair, PointerTarget, TallyWord,
};
pub use super::{u18, u24, u36};
