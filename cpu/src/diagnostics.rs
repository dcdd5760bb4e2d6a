//! Diagnostic information for log messages and faults.
//!
//! The hardware reports only a fault number and a subgroup; the
//! emulator also says which instruction was executing.
use std::fmt::{Display, Formatter};

use serde::Serialize;

use base::prelude::{Instruction, SegmentNumber, WordAddress};

/// CurrentInstructionDiagnostics is only for generating debug
/// information.  They must not be used for control/execution
/// purposes.
///
/// We clone this struct whenever a fault is raised, so a clone of it
/// needs to remain cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentInstructionDiagnostics {
    #[serde(serialize_with = "serialize_instruction")]
    pub current_instruction: Instruction,
    pub segment: SegmentNumber,
    pub instruction_counter: WordAddress,
}

pub(crate) fn serialize_instruction<S>(inst: &Instruction, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u64(u64::from(inst.bits()))
}

impl Display for &CurrentInstructionDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "instruction {:>012o} ({}) at {:o}|{:>06o}",
            self.current_instruction.bits(),
            self.current_instruction,
            self.segment,
            self.instruction_counter
        )
    }
}

pub trait DiagnosticFetcher {
    fn diagnostics(self) -> CurrentInstructionDiagnostics;
}

impl DiagnosticFetcher for CurrentInstructionDiagnostics {
    fn diagnostics(self) -> CurrentInstructionDiagnostics {
        self
    }
}

impl DiagnosticFetcher for &CurrentInstructionDiagnostics {
    fn diagnostics(self) -> CurrentInstructionDiagnostics {
        self.clone()
    }
}
