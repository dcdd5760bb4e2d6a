//! The address modifier.
//!
//! Forms the computed address (CA) of an operand from an address and
//! a tag, following indirect words and tally words as the tags
//! direct, and then (optionally) reads or writes the operand.
//!
//! The four modifier types are handled by one loop over the current
//! tag.  R is always the last step.  RI and IR fetch an indirect
//! word and go round again with that word's tag; IR also holds its
//! register designator, which is applied when the chain ends.  IT
//! fetches a tally word, and ends there except for `idc` and `dic`,
//! which carry on with the tag in the tally word.
//!
//! Every indirect or tally word fetched counts against the
//! configured maximum indirection depth.  The hardware will happily
//! follow a loop of indirect words forever; we raise a LOOP fault
//! instead.
use tracing::{event, span, Level};

use base::prelude::*;
use base::subword;

mod tally;

pub use tally::CharacterSelector;

use crate::accessor::{AccessType, IndirectFetch};
use crate::fault::Fault;
use crate::memory::Memory;
use crate::processor::Processor;
use crate::registers::Indicator;

/// What to do with the operand once its address is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write(Unsigned36Bit),
    /// Form the address (with all the side effects of doing so) but
    /// do not touch the operand.
    PrepareOnly,
}

/// The outcome of address formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The final computed address.
    pub effective_address: WordAddress,
    /// The operand which was read, or the direct operand of `du` and
    /// `dl`.  For a character reference, the character,
    /// right-justified.
    pub operand: Option<Unsigned36Bit>,
    /// Set when an IT modifier selected a single character.
    pub character: Option<CharacterSelector>,
}

enum TallyOutcome {
    Done(Resolution),
    Continue(Tag),
}

impl Processor {
    /// Form the operand address of the current instruction.
    ///
    /// The TPR is first set up from the instruction: from the PPR
    /// ordinarily, or from the pointer register named in the address
    /// field when the A bit is set.  The A bit only routes this
    /// instruction's operand reference through the appending unit;
    /// `pointer_register_relative` is cleared again on return.
    pub fn resolve_instruction<M: Memory>(
        &mut self,
        mem: &mut M,
        operation: Operation,
    ) -> Result<Resolution, Fault> {
        let inst = self.regs.instruction;
        self.regs.pointer_register_relative = inst.is_pointer_register_relative();
        let ca = match inst.pointer_register_address() {
            Some(pra) => {
                let pr = *self.regs.pointer_register(pra.register);
                self.regs.tpr.tsr = pr.snr;
                self.regs.tpr.trr = pr.rnr.max(self.regs.ppr.prr);
                self.regs.tpr.tbr = pr.bitno;
                pr.wordno.wrapping_add(pra.offset_as_18_bits())
            }
            None => {
                self.regs.tpr.tsr = self.regs.ppr.psr;
                self.regs.tpr.trr = self.regs.ppr.prr;
                self.regs.tpr.tbr = BitOffset::ZERO;
                inst.address()
            }
        };
        let result = self.resolve(mem, inst.tag(), ca, operation);
        self.regs.pointer_register_relative = false;
        result
    }

    /// Form the computed address from `address` and `tag`, using the
    /// segment and ring already in the TPR, then perform `operation`
    /// on the operand.
    pub fn resolve<M: Memory>(
        &mut self,
        mem: &mut M,
        tag: Tag,
        address: WordAddress,
        operation: Operation,
    ) -> Result<Resolution, Fault> {
        let span = span!(
            Level::TRACE,
            "resolve",
            tag = %tag,
            address = %address
        );
        let _enter = span.enter();

        self.regs.held_register = None;
        self.regs.escalated = false;
        self.regs.tpr.ca = address;
        let result = self.modify(mem, tag, operation);
        self.regs.held_register = None;
        self.regs.escalated = false;
        match result {
            Ok(resolution) => {
                event!(
                    Level::TRACE,
                    "effective address is {:o}|{:>06o}",
                    self.regs.tpr.tsr,
                    resolution.effective_address
                );
                Ok(resolution)
            }
            Err(fault) => {
                event!(Level::DEBUG, "address formation failed: {}", fault);
                Err(fault.with_diagnostics(&self.regs))
            }
        }
    }

    fn modify<M: Memory>(
        &mut self,
        mem: &mut M,
        initial_tag: Tag,
        operation: Operation,
    ) -> Result<Resolution, Fault> {
        let mut tag = initial_tag;
        let mut hops: usize = 0;
        loop {
            event!(
                Level::TRACE,
                "modifier {} with CA={:>06o}",
                tag,
                self.regs.tpr.ca
            );
            match tag.modifier() {
                Modifier::Register(rd) => {
                    let rd = self.regs.held_register.take().unwrap_or(rd);
                    return self.register_modification(mem, tag, rd, operation);
                }
                Modifier::RegisterIndirect(rd) => {
                    if rd.is_direct() {
                        return Err(Fault::illegal_modifier(
                            tag,
                            format!("{rd} cannot be used with register-then-indirect modification"),
                        ));
                    }
                    self.regs.tpr.ca = self.regs.tpr.ca.wrapping_add(self.register_value(rd));
                    tag = self.follow_indirect(mem, &mut hops)?;
                }
                Modifier::IndirectRegister(rd) => {
                    self.regs.held_register = Some(rd);
                    tag = self.follow_indirect(mem, &mut hops)?;
                }
                Modifier::IndirectTally(it) => {
                    if let Some(held) = self.regs.held_register.take() {
                        // An IT tag ends an IR chain.
                        return match Processor::fault_tag_number(it) {
                            Some(n) => Err(Processor::fault_tag(tag, n)),
                            None => self.register_modification(mem, tag, held, operation),
                        };
                    }
                    match it {
                        IndirectTallyDesignator::F1
                        | IndirectTallyDesignator::F2
                        | IndirectTallyDesignator::F3 => {
                            let n = Processor::fault_tag_number(it).unwrap_or(Unsigned2Bit::ONE);
                            return Err(Processor::fault_tag(tag, n));
                        }
                        IndirectTallyDesignator::Its
                        | IndirectTallyDesignator::Itp
                        | IndirectTallyDesignator::Undefined => {
                            return Err(Fault::illegal_modifier(
                                tag,
                                format!("{it} is not a valid address modifier here"),
                            ));
                        }
                        _ => match self.tally_modification(mem, tag, it, operation, &mut hops)? {
                            TallyOutcome::Done(resolution) => return Ok(resolution),
                            TallyOutcome::Continue(next) => {
                                tag = next;
                            }
                        },
                    }
                }
            }
        }
    }

    fn fault_tag_number(it: IndirectTallyDesignator) -> Option<Unsigned2Bit> {
        match it {
            IndirectTallyDesignator::F1 => Some(Unsigned2Bit::new::<1>()),
            IndirectTallyDesignator::F2 => Some(Unsigned2Bit::new::<2>()),
            IndirectTallyDesignator::F3 => Some(Unsigned2Bit::new::<3>()),
            _ => None,
        }
    }

    fn fault_tag(tag: Tag, n: Unsigned2Bit) -> Fault {
        Fault::directed(n, format!("fault tag {tag} in an indirect chain"))
    }

    /// The contents of the register named by `rd`, for adding to the
    /// computed address.
    fn register_value(&self, rd: RegisterDesignator) -> Unsigned18Bit {
        let regs = &self.regs;
        match rd {
            RegisterDesignator::N | RegisterDesignator::Du | RegisterDesignator::Dl => {
                Unsigned18Bit::ZERO
            }
            RegisterDesignator::Au => subword::upper_half(regs.a),
            RegisterDesignator::Qu => subword::upper_half(regs.q),
            RegisterDesignator::Al => subword::lower_half(regs.a),
            RegisterDesignator::Ql => subword::lower_half(regs.q),
            RegisterDesignator::Ic => regs.ppr.ic,
            RegisterDesignator::X(n) => regs.index_register(n),
        }
    }

    fn count_hop(&self, hops: &mut usize) -> Result<(), Fault> {
        *hops += 1;
        if *hops > self.config.max_indirection_depth {
            event!(
                Level::DEBUG,
                "giving up after {} levels of indirection at {:>06o}",
                self.config.max_indirection_depth,
                self.regs.tpr.ca
            );
            Err(Fault::indirection_loop(
                self.regs.tpr.ca,
                self.config.max_indirection_depth,
            ))
        } else {
            Ok(())
        }
    }

    /// Fetch the indirect word at CA and load its address into CA.
    /// Returns the tag to continue with.
    fn follow_indirect<M: Memory>(&mut self, mem: &mut M, hops: &mut usize) -> Result<Tag, Fault> {
        self.count_hop(hops)?;
        match self.fetch_indirect(mem, self.regs.tpr.ca)? {
            IndirectFetch::Word(w) => {
                let iw = IndirectWord::from(w);
                event!(Level::TRACE, "indirect word {:?}", iw);
                self.regs.tpr.ca = iw.address();
                Ok(iw.tag())
            }
            IndirectFetch::Pair { pair, r1 } => Ok(self.follow_pointer_pair(&pair, r1)),
        }
    }

    fn follow_pointer_pair(&mut self, pair: &PointerPair, r1: Option<Ring>) -> Tag {
        let r1 = r1.unwrap_or(Ring::ZERO);
        let target = pair.target();
        let tpr = &mut self.regs.tpr;
        match pair {
            PointerPair::Segment { segment, ring, .. } => {
                tpr.tsr = *segment;
                tpr.trr = (*ring).max(tpr.trr).max(r1);
                tpr.ca = target.word_number;
                tpr.tbr = target.bit_number;
            }
            PointerPair::PointerRegister { register, .. } => {
                let pr = self.regs.pr[usize::from(*register)];
                let bits = u32::from(pr.bitno) + u32::from(target.bit_number);
                let carry = Unsigned18Bit::truncating_from(u64::from(bits / 36));
                tpr.tsr = pr.snr;
                tpr.trr = pr.rnr.max(tpr.trr).max(r1);
                tpr.ca = pr
                    .wordno
                    .wrapping_add(target.word_number)
                    .wrapping_add(carry);
                tpr.tbr = BitOffset::truncating_from(u64::from(bits % 36));
            }
        }
        event!(
            Level::TRACE,
            "followed pointer pair {:?} to {:o}|{:>06o} in ring {}",
            pair,
            tpr.tsr,
            tpr.ca,
            tpr.trr
        );
        target.tag
    }

    fn register_modification<M: Memory>(
        &mut self,
        mem: &mut M,
        tag: Tag,
        rd: RegisterDesignator,
        operation: Operation,
    ) -> Result<Resolution, Fault> {
        if rd.is_direct() {
            let ca = self.regs.tpr.ca;
            if let Operation::Write(_) = operation {
                return Err(Fault::illegal_modifier(
                    tag,
                    format!("cannot store into the direct operand of {rd}"),
                ));
            }
            let operand = if rd == RegisterDesignator::Du {
                subword::join_halves(ca, Unsigned18Bit::ZERO)
            } else {
                subword::join_halves(Unsigned18Bit::ZERO, ca)
            };
            return Ok(Resolution {
                effective_address: ca,
                operand: Some(operand),
                character: None,
            });
        }
        self.regs.tpr.ca = self.regs.tpr.ca.wrapping_add(self.register_value(rd));
        self.access_operand(mem, tag, None, operation)
    }

    fn tally_modification<M: Memory>(
        &mut self,
        mem: &mut M,
        tag: Tag,
        it: IndirectTallyDesignator,
        operation: Operation,
        hops: &mut usize,
    ) -> Result<TallyOutcome, Fault> {
        self.count_hop(hops)?;
        let word_address = self.regs.tpr.ca;
        let word = self.read(mem, word_address, AccessType::IndirectWordFetch)?;
        if it.is_character() {
            let ctw = CharacterTallyWord::from(word);
            if !ctw.position_is_valid() {
                return Err(Fault::illegal_modifier(
                    tag,
                    format!(
                        "character position {} is not valid for {}-bit characters",
                        ctw.position(),
                        ctw.size().bits()
                    ),
                ));
            }
        }
        let step = tally::step(it, word).ok_or_else(|| {
            Fault::illegal_modifier(tag, format!("{it} does not use a tally word"))
        })?;
        if let Some(rewritten) = step.rewrite {
            self.write(mem, word_address, rewritten, AccessType::IndirectWordStore)?;
        }
        if let Some(t) = step.tally {
            self.regs
                .indicators
                .set(Indicator::TallyRunout, t.is_zero());
        }
        self.regs.tpr.ca = step.effective_address;
        if let Some(sel) = step.character {
            self.regs.tpr.tbr = sel.bit_offset().map_err(|_| {
                Fault::illegal_modifier(tag, format!("invalid character position {}", sel.position))
            })?;
        }
        event!(
            Level::TRACE,
            "{} word at {:>06o}: {:>012o} -> {:?}",
            it,
            word_address,
            word,
            step
        );
        match step.continuation {
            Some(next) => Ok(TallyOutcome::Continue(next)),
            None => Ok(TallyOutcome::Done(self.access_operand(
                mem,
                tag,
                step.character,
                operation,
            )?)),
        }
    }

    /// Perform `operation` on the operand at CA.
    fn access_operand<M: Memory>(
        &mut self,
        mem: &mut M,
        tag: Tag,
        character: Option<CharacterSelector>,
        operation: Operation,
    ) -> Result<Resolution, Fault> {
        let ca = self.regs.tpr.ca;
        let bad_character = |_| Fault::illegal_modifier(tag, "invalid character position".to_string());
        let operand = match (operation, character) {
            (Operation::PrepareOnly, _) => None,
            (Operation::Read, None) => Some(self.read(mem, ca, AccessType::OperandRead)?),
            (Operation::Write(value), None) => {
                self.write(mem, ca, value, AccessType::OperandWrite)?;
                None
            }
            (Operation::Read, Some(sel)) => {
                let word = self.read(mem, ca, AccessType::OperandRead)?;
                Some(sel.extract(word).map_err(bad_character)?)
            }
            (Operation::Write(value), Some(sel)) => {
                let word = self.read(mem, ca, AccessType::OperandRead)?;
                let updated = sel.insert(word, value).map_err(bad_character)?;
                self.write(mem, ca, updated, AccessType::OperandWrite)?;
                None
            }
        };
        Ok(Resolution {
            effective_address: ca,
            operand,
            character,
        })
    }
}

#[cfg(test)]
mod tests;
