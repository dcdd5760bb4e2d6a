//! This crate emulates the address-formation hardware of a 36-bit
//! segmented processor: the address modifier, the appending unit
//! with its associative memories, and the memory accessor which sits
//! between them and physical memory.
//!
//! Instruction execution, I/O and fault delivery are not here; a
//! caller executes an instruction by loading it into the
//! [`ProcessorContext`] and asking the [`Processor`] to resolve its
//! operand.  Faults come back as [`Fault`] values.
#![crate_name = "cpu"]

mod accessor;
mod appending;
mod associative;
mod descriptor;
mod diagnostics;
mod fault;
mod memory;
mod modifier;
mod processor;
mod registers;

pub use accessor::AccessType;
pub use appending::{AppendingUnit, PageKey};
pub use associative::{AssociativeMemory, SlotStatus, DEFAULT_ASSOCIATIVE_MEMORY_SIZE};
pub use descriptor::{split_page_offset, PageDescriptor, SegmentDescriptor, PAGE_SIZE};
pub use diagnostics::{CurrentInstructionDiagnostics, DiagnosticFetcher};
pub use fault::{
    AccessViolation, Fault, FaultDetails, FaultKind, StoreFault, UnknownFaultName,
};
pub use memory::{
    MainMemory, Memory, MemoryConfiguration, MemoryOpFailure, SharedMemory,
    DEFAULT_MEMORY_WORDS, MAX_MEMORY_WORDS,
};
pub use modifier::{CharacterSelector, Operation, Resolution};
pub use processor::{Processor, ProcessorConfiguration, DEFAULT_MAX_INDIRECTION_DEPTH};
pub use registers::{
    AddressingMode, BaseAddressRegister, DescriptorSegmentBase, Indicator, Indicators,
    PointerRegister, ProcedurePointer, ProcessorContext, TemporaryPointer, BAR_BLOCK_SIZE,
};
