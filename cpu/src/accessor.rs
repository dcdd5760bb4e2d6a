//! Logical memory references.
//!
//! Every read or write made during address formation (and by the
//! instruction executor) comes through here.  The processor's
//! addressing mode decides how the 18-bit address becomes a physical
//! one:
//!
//! * absolute: it already is one;
//! * appending: it is an offset within the segment named by the TPR
//!   (or the PPR, for instruction fetches) and the appending unit
//!   translates it;
//! * BAR: it is relocated by the base-address register and checked
//!   against the BAR bound.
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use base::prelude::*;

use crate::fault::{Fault, StoreFault};
use crate::memory::Memory;
use crate::processor::Processor;
use crate::registers::{AddressingMode, BAR_BLOCK_SIZE};

/// Why memory is being referenced.  The appending unit checks a
/// different access bit and ring bracket for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    InstructionFetch,
    OperandRead,
    OperandWrite,
    IndirectWordFetch,
    /// Rewriting a tally word.
    IndirectWordStore,
}

impl AccessType {
    pub fn is_write(&self) -> bool {
        matches!(self, AccessType::OperandWrite | AccessType::IndirectWordStore)
    }
}

impl Display for AccessType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessType::InstructionFetch => "instruction fetch",
            AccessType::OperandRead => "operand read",
            AccessType::OperandWrite => "operand write",
            AccessType::IndirectWordFetch => "indirect word fetch",
            AccessType::IndirectWordStore => "indirect word store",
        })
    }
}

/// The result of fetching an indirect word which may be the first
/// word of a pointer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndirectFetch {
    Word(Unsigned36Bit),
    Pair {
        pair: PointerPair,
        /// R1 of the segment the pair was fetched from, if it was
        /// fetched through the appending unit.
        r1: Option<Ring>,
    },
}

impl Processor {
    fn physical_address<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        access: AccessType,
    ) -> Result<PhysicalAddress, Fault> {
        let (mode, ring, segment) = if access == AccessType::InstructionFetch {
            (
                self.regs.addressing_mode,
                self.regs.ppr.prr,
                self.regs.ppr.psr,
            )
        } else if self.regs.uses_appending() {
            (AddressingMode::Appending, self.regs.tpr.trr, self.regs.tpr.tsr)
        } else {
            (
                self.regs.addressing_mode,
                self.regs.tpr.trr,
                self.regs.tpr.tsr,
            )
        };
        match mode {
            AddressingMode::Absolute => Ok(PhysicalAddress::from(address)),
            AddressingMode::Appending => {
                self.appending
                    .translate(&self.regs, mem, ring, segment, address, access)
            }
            AddressingMode::Bar => {
                let base = u32::from(self.regs.bar.base) * BAR_BLOCK_SIZE;
                let bound = u32::from(self.regs.bar.bound) * BAR_BLOCK_SIZE;
                if u32::from(address) >= bound {
                    event!(
                        Level::DEBUG,
                        "BAR-mode address {:>06o} is beyond the BAR bound {:o}",
                        address,
                        bound
                    );
                    return Err(Fault::store(
                        StoreFault::OutOfBarBounds(address),
                        format!("{access} beyond the BAR bound {bound:o}"),
                    ));
                }
                Ok(PhysicalAddress::truncating_from(u64::from(
                    u32::from(address) + base,
                )))
            }
        }
    }

    /// Read the word at `address`.
    pub fn read<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        access: AccessType,
    ) -> Result<Unsigned36Bit, Fault> {
        let physical = self.physical_address(mem, address, access)?;
        let word = mem.read36(physical).map_err(|e| {
            event!(Level::DEBUG, "{} at {:>06o} failed: {}", access, address, e);
            Fault::nonexistent_memory(&e, "memory")
        })?;
        event!(
            Level::TRACE,
            "{} at {:>06o} (physical {:>08o}) read {:>012o}",
            access,
            address,
            physical,
            word
        );
        Ok(word)
    }

    /// Write `value` to `address`.
    pub fn write<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        value: Unsigned36Bit,
        access: AccessType,
    ) -> Result<(), Fault> {
        let physical = self.physical_address(mem, address, access)?;
        event!(
            Level::TRACE,
            "{} at {:>06o} (physical {:>08o}) writing {:>012o}",
            access,
            address,
            physical,
            value
        );
        mem.write36(physical, value).map_err(|e| {
            event!(Level::DEBUG, "{} at {:>06o} failed: {}", access, address, e);
            Fault::nonexistent_memory(&e, "memory")
        })
    }

    /// Read the even/odd pair of words containing `address`.
    pub fn read_pair<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        access: AccessType,
    ) -> Result<(Unsigned36Bit, Unsigned36Bit), Fault> {
        let even = address.and(!1);
        let even_word = self.read(mem, even, access)?;
        let odd_word = self.read(mem, even.bitor(1), access)?;
        Ok((even_word, odd_word))
    }

    /// Write the even/odd pair of words containing `address`.
    pub fn write_pair<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        words: (Unsigned36Bit, Unsigned36Bit),
        access: AccessType,
    ) -> Result<(), Fault> {
        let even = address.and(!1);
        self.write(mem, even, words.0, access)?;
        self.write(mem, even.bitor(1), words.1, access)
    }

    /// Read `n` consecutive words starting at `address`.  Addresses
    /// wrap at the top of the 18-bit address space.
    pub fn read_n<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
        n: usize,
        access: AccessType,
    ) -> Result<Vec<Unsigned36Bit>, Fault> {
        let mut result = Vec::with_capacity(n);
        let mut current = address;
        for _ in 0..n {
            result.push(self.read(mem, current, access)?);
            current = current.successor();
        }
        Ok(result)
    }

    /// Fetch an indirect word for the R, RI or IR modifiers.  If the
    /// word is at an even address and is tagged as the first word of
    /// a pointer pair, the odd word is fetched too.
    ///
    /// In absolute mode, the pair itself is read with absolute
    /// addresses, and the rest of the current address formation
    /// (following the pointer and the operand access) goes through
    /// the appending unit.  `resolve` drops back to absolute mode
    /// when it finishes.
    pub(crate) fn fetch_indirect<M: Memory>(
        &mut self,
        mem: &mut M,
        address: WordAddress,
    ) -> Result<IndirectFetch, Fault> {
        let even_word = self.read(mem, address, AccessType::IndirectWordFetch)?;
        let is_even = u32::from(address) & 1 == 0;
        if !is_even || !IndirectWord::from(even_word).tag().is_pointer_pair() {
            return Ok(IndirectFetch::Word(even_word));
        }
        let through_appending = self.regs.uses_appending();
        let odd_word = self.read(mem, address.bitor(1), AccessType::IndirectWordFetch)?;
        let r1 = if through_appending {
            self.appending.last_sdw().map(|sdw| sdw.r1)
        } else {
            None
        };
        if self.regs.addressing_mode == AddressingMode::Absolute && !through_appending {
            event!(
                Level::WARN,
                "pointer pair at absolute address {:>06o} switches this reference to appending mode",
                address
            );
            self.regs.escalated = true;
        }
        match PointerPair::decode(even_word, odd_word) {
            Some(pair) => Ok(IndirectFetch::Pair { pair, r1 }),
            // decode() accepts exactly the tags is_pointer_pair() does.
            None => Ok(IndirectFetch::Word(even_word)),
        }
    }
}
