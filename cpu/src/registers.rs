//! The processor registers which take part in address formation.
//!
//! All of them live in one [`ProcessorContext`] value, owned by the
//! [`crate::Processor`].  Nothing here is global; a test can build a
//! context, poke registers directly and hand it to the processor.
use std::fmt::{self, Debug, Formatter};

use serde::Serialize;

use base::prelude::*;

use crate::diagnostics::{CurrentInstructionDiagnostics, DiagnosticFetcher};

/// How the accessor turns a computed address into a physical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressingMode {
    /// The computed address is the physical address.
    Absolute,
    /// The computed address is an offset within the segment named by
    /// the temporary (or procedure) pointer.
    Appending,
    /// The computed address is relocated and bounded by the
    /// base-address register.
    Bar,
}

/// PPR: where the current instruction came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcedurePointer {
    /// Ring of execution (PRR).
    pub prr: Ring,
    /// Segment of the current procedure (PSR).
    pub psr: SegmentNumber,
    /// Privileged-procedure flag.
    pub p: bool,
    /// Instruction counter.
    pub ic: WordAddress,
}

/// TPR: the address being formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TemporaryPointer {
    /// Effective ring of the reference (TRR).
    pub trr: Ring,
    /// Segment of the reference (TSR).
    pub tsr: SegmentNumber,
    /// Bit offset within the word (TBR).
    pub tbr: BitOffset,
    /// Computed address.
    pub ca: WordAddress,
}

/// One of the eight pointer registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PointerRegister {
    pub rnr: Ring,
    pub snr: SegmentNumber,
    pub wordno: WordAddress,
    pub bitno: BitOffset,
}

/// DSBR: locates the descriptor segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DescriptorSegmentBase {
    /// Physical address of the descriptor segment (or of its page
    /// table, when it is paged).
    pub addr: PhysicalAddress,
    /// Highest valid 16-word block of the descriptor segment.
    pub bound: Unsigned14Bit,
    /// True if the descriptor segment is not paged.
    pub unpaged: bool,
    pub stack: Unsigned12Bit,
}

/// BAR: relocation for BAR mode.  Both fields are in units of 512
/// words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BaseAddressRegister {
    pub base: Unsigned9Bit,
    pub bound: Unsigned9Bit,
}

pub const BAR_BLOCK_SIZE: u32 = 512;

/// The named bits of the indicator register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Indicator {
    Zero,
    Negative,
    Carry,
    Overflow,
    ExponentOverflow,
    ExponentUnderflow,
    OverflowMask,
    TallyRunout,
    ParityError,
    ParityMask,
    NotBar,
    Truncation,
    MidInstructionInterruptFault,
    AbsoluteMode,
    HexMode,
}

impl Indicator {
    pub const fn mask(&self) -> u32 {
        match self {
            Indicator::Zero => 0o400_000,
            Indicator::Negative => 0o200_000,
            Indicator::Carry => 0o100_000,
            Indicator::Overflow => 0o040_000,
            Indicator::ExponentOverflow => 0o020_000,
            Indicator::ExponentUnderflow => 0o010_000,
            Indicator::OverflowMask => 0o004_000,
            Indicator::TallyRunout => 0o002_000,
            Indicator::ParityError => 0o001_000,
            Indicator::ParityMask => 0o000_400,
            Indicator::NotBar => 0o000_200,
            Indicator::Truncation => 0o000_100,
            Indicator::MidInstructionInterruptFault => 0o000_040,
            Indicator::AbsoluteMode => 0o000_020,
            Indicator::HexMode => 0o000_010,
        }
    }
}

/// The indicator register.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Indicators(Unsigned18Bit);

impl Indicators {
    pub fn bits(&self) -> Unsigned18Bit {
        self.0
    }

    pub fn is_set(&self, which: Indicator) -> bool {
        self.0 & which.mask() != Unsigned18Bit::ZERO
    }

    pub fn set(&mut self, which: Indicator, value: bool) {
        self.0 = if value {
            self.0 | which.mask()
        } else {
            self.0 & !Unsigned18Bit::truncating_from(u64::from(which.mask()))
        };
    }
}

impl From<Unsigned18Bit> for Indicators {
    fn from(bits: Unsigned18Bit) -> Indicators {
        Indicators(bits)
    }
}

impl Debug for Indicators {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Indicators({:>06o})", self.0)
    }
}

/// The register file.  Fields are public; the address modifier and
/// the accessor read and update them as the hardware would.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorContext {
    pub a: Unsigned36Bit,
    pub q: Unsigned36Bit,
    pub x: [Unsigned18Bit; 8],
    pub ppr: ProcedurePointer,
    pub tpr: TemporaryPointer,
    pub pr: [PointerRegister; 8],
    pub indicators: Indicators,
    pub dsbr: DescriptorSegmentBase,
    pub bar: BaseAddressRegister,
    pub addressing_mode: AddressingMode,
    /// The instruction being executed.
    #[serde(serialize_with = "crate::diagnostics::serialize_instruction")]
    pub instruction: Instruction,
    /// The register designator held across an IR chain.
    #[serde(skip)]
    pub held_register: Option<RegisterDesignator>,
    /// Set when the current instruction's operand is addressed
    /// through a pointer register (the A bit).  Such references use
    /// the appending unit even in absolute mode.
    pub pointer_register_relative: bool,
    /// Set when a pointer pair was met in absolute mode during the
    /// address formation in progress.  The rest of that formation
    /// goes through the appending unit; `addressing_mode` is left
    /// alone.
    #[serde(skip)]
    pub escalated: bool,
}

impl ProcessorContext {
    pub fn new() -> ProcessorContext {
        ProcessorContext {
            a: Unsigned36Bit::ZERO,
            q: Unsigned36Bit::ZERO,
            x: [Unsigned18Bit::ZERO; 8],
            ppr: ProcedurePointer::default(),
            tpr: TemporaryPointer::default(),
            pr: [PointerRegister::default(); 8],
            indicators: Indicators::default(),
            dsbr: DescriptorSegmentBase::default(),
            bar: BaseAddressRegister::default(),
            addressing_mode: AddressingMode::Absolute,
            instruction: Instruction::default(),
            held_register: None,
            pointer_register_relative: false,
            escalated: false,
        }
    }

    pub fn index_register(&self, n: Unsigned3Bit) -> Unsigned18Bit {
        self.x[usize::from(n)]
    }

    pub fn set_index_register(&mut self, n: Unsigned3Bit, value: Unsigned18Bit) {
        self.x[usize::from(n)] = value;
    }

    pub fn pointer_register(&self, n: Unsigned3Bit) -> &PointerRegister {
        &self.pr[usize::from(n)]
    }

    pub fn pointer_register_mut(&mut self, n: Unsigned3Bit) -> &mut PointerRegister {
        &mut self.pr[usize::from(n)]
    }

    /// True if references go through the appending unit.
    pub fn uses_appending(&self) -> bool {
        self.addressing_mode == AddressingMode::Appending
            || self.pointer_register_relative
            || self.escalated
    }
}

impl Default for ProcessorContext {
    fn default() -> ProcessorContext {
        ProcessorContext::new()
    }
}

impl DiagnosticFetcher for &ProcessorContext {
    fn diagnostics(self) -> CurrentInstructionDiagnostics {
        CurrentInstructionDiagnostics {
            current_instruction: self.instruction,
            segment: self.ppr.psr,
            instruction_counter: self.ppr.ic,
        }
    }
}
