//! Processor faults.
//!
//! A fault stops address formation immediately.  The caller gets a
//! [`Fault`] which names the fault kind and subgroup (the values the
//! hardware would store for the fault handler) together with a
//! human-readable explanation.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::prelude::*;

use super::diagnostics::{CurrentInstructionDiagnostics, DiagnosticFetcher};
use super::memory::MemoryOpFailure;

/// Describes the kinds of fault that address formation can raise.
///
/// These acronyms are upper case to follow the names in the
/// processor documentation.  The meanings of the values are described
/// in [`FaultDetails`].
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum FaultKind {
    IPR,
    DF0,
    DF1,
    DF2,
    DF3,
    ACV,
    STR,
    LOOP,
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            FaultKind::IPR => "IPR",
            FaultKind::DF0 => "DF0",
            FaultKind::DF1 => "DF1",
            FaultKind::DF2 => "DF2",
            FaultKind::DF3 => "DF3",
            FaultKind::ACV => "ACV",
            FaultKind::STR => "STR",
            FaultKind::LOOP => "LOOP",
        })
    }
}

impl FaultKind {
    #[must_use]
    pub const fn all_fault_kinds() -> [FaultKind; 8] {
        [
            FaultKind::IPR,
            FaultKind::DF0,
            FaultKind::DF1,
            FaultKind::DF2,
            FaultKind::DF3,
            FaultKind::ACV,
            FaultKind::STR,
            FaultKind::LOOP,
        ]
    }

    /// The directed fault with the given number.
    #[must_use]
    pub fn directed(n: Unsigned2Bit) -> FaultKind {
        match u8::from(n) {
            0 => FaultKind::DF0,
            1 => FaultKind::DF1,
            2 => FaultKind::DF2,
            _ => FaultKind::DF3,
        }
    }
}

#[derive(Debug)]
pub struct UnknownFaultName(String);

impl Display for UnknownFaultName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "unknown fault name '{}'", self.0)
    }
}

impl Error for UnknownFaultName {}

impl TryFrom<&str> for FaultKind {
    type Error = UnknownFaultName;
    fn try_from(s: &str) -> Result<FaultKind, UnknownFaultName> {
        match s {
            "IPR" => Ok(FaultKind::IPR),
            "DF0" => Ok(FaultKind::DF0),
            "DF1" => Ok(FaultKind::DF1),
            "DF2" => Ok(FaultKind::DF2),
            "DF3" => Ok(FaultKind::DF3),
            "ACV" => Ok(FaultKind::ACV),
            "STR" => Ok(FaultKind::STR),
            "LOOP" => Ok(FaultKind::LOOP),
            _ => Err(UnknownFaultName(s.to_owned())),
        }
    }
}

#[test]
fn test_fault_kind_round_trip() {
    for orig_kind in FaultKind::all_fault_kinds() {
        let name = orig_kind.to_string();
        match FaultKind::try_from(name.as_str()) {
            Ok(k) => {
                assert_eq!(k, orig_kind);
            }
            Err(_) => {
                panic!("unable to round-trip fault kind {orig_kind:?}");
            }
        }
    }
    assert!(FaultKind::try_from("this is not a fault name").is_err());
}

/// Access-violation subgroups.  The discriminant is the subgroup
/// number reported with the fault.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum AccessViolation {
    IllegalRingOrder = 0,
    OutOfExecuteBracket = 1,
    ExecuteOff = 2,
    OutOfReadBracket = 3,
    ReadOff = 4,
    OutOfWriteBracket = 5,
    WriteOff = 6,
    NotAGate = 7,
    OutOfCallBracket = 8,
    OutwardCall = 9,
    BadOutwardCall = 10,
    InwardReturn = 11,
    CrossRingTransfer = 12,
    RingAlarm = 13,
    AssociativeMemoryError = 14,
    OutOfSegmentBounds = 15,
}

impl AccessViolation {
    pub fn subgroup(&self) -> u8 {
        *self as u8
    }

    /// The mnemonic used in fault listings.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            AccessViolation::IllegalRingOrder => "IRO",
            AccessViolation::OutOfExecuteBracket => "OEB",
            AccessViolation::ExecuteOff => "E-OFF",
            AccessViolation::OutOfReadBracket => "ORB",
            AccessViolation::ReadOff => "R-OFF",
            AccessViolation::OutOfWriteBracket => "OWB",
            AccessViolation::WriteOff => "W-OFF",
            AccessViolation::NotAGate => "NO-GA",
            AccessViolation::OutOfCallBracket => "OCB",
            AccessViolation::OutwardCall => "OCALL",
            AccessViolation::BadOutwardCall => "BOC",
            AccessViolation::InwardReturn => "INRET",
            AccessViolation::CrossRingTransfer => "CRT",
            AccessViolation::RingAlarm => "RALR",
            AccessViolation::AssociativeMemoryError => "AME",
            AccessViolation::OutOfSegmentBounds => "OOSB",
        }
    }
}

impl Display for AccessViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(self.mnemonic())
    }
}

/// Store-fault subgroups.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum StoreFault {
    /// Physical address beyond the end of memory.
    NonexistentMemory(PhysicalAddress),
    /// BAR-mode address at or beyond the BAR bound.
    OutOfBarBounds(WordAddress),
}

impl StoreFault {
    pub fn subgroup(&self) -> u8 {
        match self {
            StoreFault::NonexistentMemory(_) => 0,
            StoreFault::OutOfBarBounds(_) => 1,
        }
    }
}

impl Display for StoreFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            StoreFault::NonexistentMemory(addr) => {
                write!(f, "nonexistent memory at physical address {addr:>08o}")
            }
            StoreFault::OutOfBarBounds(addr) => {
                write!(f, "address {addr:>06o} is outside the BAR bound")
            }
        }
    }
}

/// `FaultDetails` carries the kind-specific information of a fault.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDetails {
    /// Illegal procedure: an illegal address modifier, a character
    /// position outside the word, or `du`/`dl` used where they are
    /// not allowed.
    IPR { tag: Tag, message: String },

    /// Directed fault: a descriptor was not present, or an indirect
    /// word carried a fault tag.
    DF { fault: Unsigned2Bit, message: String },

    /// Access violation.
    ACV {
        violation: AccessViolation,
        segment: SegmentNumber,
        offset: WordAddress,
        message: String,
    },

    /// Store fault.
    STR { cause: StoreFault, message: String },

    /// The indirection chain grew longer than the configured limit.
    /// Detection of this is not a feature of the hardware, this
    /// occurs only in the emulator.
    LOOP {
        /// Some address within the chain.
        address: WordAddress,
        depth: usize,
    },
}

impl FaultDetails {
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            FaultDetails::IPR { .. } => FaultKind::IPR,
            FaultDetails::DF { fault, .. } => FaultKind::directed(*fault),
            FaultDetails::ACV { .. } => FaultKind::ACV,
            FaultDetails::STR { .. } => FaultKind::STR,
            FaultDetails::LOOP { .. } => FaultKind::LOOP,
        }
    }

    #[must_use]
    pub fn subgroup(&self) -> u8 {
        match self {
            FaultDetails::IPR { .. } | FaultDetails::LOOP { .. } => 0,
            FaultDetails::DF { fault, .. } => u8::from(*fault),
            FaultDetails::ACV { violation, .. } => violation.subgroup(),
            FaultDetails::STR { cause, .. } => cause.subgroup(),
        }
    }
}

impl Display for FaultDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            FaultDetails::IPR { tag, message } => {
                write!(f, "IPR: illegal modifier {tag} ({:02o}): {message}", tag.bits())
            }
            FaultDetails::DF { fault, message } => {
                write!(f, "DF{fault}: directed fault: {message}")
            }
            FaultDetails::ACV {
                violation,
                segment,
                offset,
                message,
            } => {
                write!(
                    f,
                    "ACV {violation}: access violation at {segment:o}|{offset:>06o}: {message}"
                )
            }
            FaultDetails::STR { cause, message } => {
                write!(f, "STR: {cause}: {message}")
            }
            FaultDetails::LOOP { address, depth } => {
                write!(
                    f,
                    "LOOP: indirection chain through {address:>06o} exceeded {depth} levels"
                )
            }
        }
    }
}

/// Describes a fault raised during address formation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub diagnostics: Option<CurrentInstructionDiagnostics>,
    pub details: FaultDetails,
}

impl Fault {
    pub fn new(details: FaultDetails) -> Fault {
        Fault {
            diagnostics: None,
            details,
        }
    }

    #[must_use]
    pub fn with_diagnostics<F: DiagnosticFetcher>(mut self, get_diags: F) -> Fault {
        self.diagnostics = Some(get_diags.diagnostics());
        self
    }

    #[must_use]
    pub fn kind(&self) -> FaultKind {
        self.details.kind()
    }

    #[must_use]
    pub fn subgroup(&self) -> u8 {
        self.details.subgroup()
    }

    pub(crate) fn illegal_modifier(tag: Tag, message: String) -> Fault {
        Fault::new(FaultDetails::IPR { tag, message })
    }

    pub(crate) fn directed(fault: Unsigned2Bit, message: String) -> Fault {
        Fault::new(FaultDetails::DF { fault, message })
    }

    pub(crate) fn access_violation(
        violation: AccessViolation,
        segment: SegmentNumber,
        offset: WordAddress,
        message: String,
    ) -> Fault {
        Fault::new(FaultDetails::ACV {
            violation,
            segment,
            offset,
            message,
        })
    }

    pub(crate) fn store(cause: StoreFault, message: String) -> Fault {
        Fault::new(FaultDetails::STR { cause, message })
    }

    /// Convert a failed physical memory access.  `what` says what was
    /// being fetched or stored.
    pub(crate) fn nonexistent_memory(e: &MemoryOpFailure, what: &str) -> Fault {
        let MemoryOpFailure::NotMapped(addr) = e;
        Fault::store(
            StoreFault::NonexistentMemory(*addr),
            format!("failed to access {what}: {e}"),
        )
    }

    pub(crate) fn indirection_loop(address: WordAddress, depth: usize) -> Fault {
        Fault::new(FaultDetails::LOOP { address, depth })
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.diagnostics {
            Some(diags) => write!(f, "{} during {}", self.details, diags),
            None => write!(f, "{}", self.details),
        }
    }
}

impl Error for Fault {}
