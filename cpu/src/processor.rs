//! The processor as seen by address formation.
//!
//! A [`Processor`] owns its register file and its appending unit
//! (with the associative memories).  Physical memory is not owned;
//! it is passed in to each operation, so that several processors can
//! share one [`crate::SharedMemory`].
use serde::Serialize;
use tracing::{event, Level};

use crate::appending::AppendingUnit;
use crate::associative::DEFAULT_ASSOCIATIVE_MEMORY_SIZE;
use crate::registers::{DescriptorSegmentBase, ProcessorContext};

/// Longest indirection chain followed before we decide the program
/// is looping.
pub const DEFAULT_MAX_INDIRECTION_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessorConfiguration {
    /// Number of slots in the segment descriptor associative memory.
    pub sdwam_size: usize,
    /// Number of slots in the page table word associative memory.
    pub ptwam_size: usize,
    pub sdwam_enabled: bool,
    pub ptwam_enabled: bool,
    /// Number of indirect or tally word fetches permitted while
    /// forming one address.  Going beyond this raises a LOOP fault.
    pub max_indirection_depth: usize,
}

impl Default for ProcessorConfiguration {
    fn default() -> ProcessorConfiguration {
        ProcessorConfiguration {
            sdwam_size: DEFAULT_ASSOCIATIVE_MEMORY_SIZE,
            ptwam_size: DEFAULT_ASSOCIATIVE_MEMORY_SIZE,
            sdwam_enabled: true,
            ptwam_enabled: true,
            max_indirection_depth: DEFAULT_MAX_INDIRECTION_DEPTH,
        }
    }
}

#[derive(Debug)]
pub struct Processor {
    pub(crate) regs: ProcessorContext,
    pub(crate) appending: AppendingUnit,
    pub(crate) config: ProcessorConfiguration,
}

impl Processor {
    pub fn new(config: ProcessorConfiguration) -> Processor {
        Processor {
            regs: ProcessorContext::new(),
            appending: AppendingUnit::new(&config),
            config,
        }
    }

    pub fn configuration(&self) -> &ProcessorConfiguration {
        &self.config
    }

    pub fn registers(&self) -> &ProcessorContext {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut ProcessorContext {
        &mut self.regs
    }

    pub fn appending_unit(&self) -> &AppendingUnit {
        &self.appending
    }

    pub fn appending_unit_mut(&mut self) -> &mut AppendingUnit {
        &mut self.appending
    }

    /// Switch to a new address space.  The associative memories
    /// describe the old one, so both are emptied.
    pub fn load_dsbr(&mut self, dsbr: DescriptorSegmentBase) {
        event!(
            Level::DEBUG,
            "loading DSBR: addr={:>08o} bound={:>05o} unpaged={}",
            dsbr.addr,
            dsbr.bound,
            dsbr.unpaged
        );
        self.regs.dsbr = dsbr;
        self.appending.clear_sdwam();
        self.appending.clear_ptwam();
    }
}

impl Default for Processor {
    fn default() -> Processor {
        Processor::new(ProcessorConfiguration::default())
    }
}
