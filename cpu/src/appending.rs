//! The appending unit: translation of (ring, segment, offset) into a
//! physical address.
//!
//! Translation looks up the segment's descriptor (from the SDW
//! associative memory, or from the descriptor segment located by the
//! DSBR), checks the reference against the ring brackets, the access
//! bits and the segment bound, and then either relocates the offset
//! directly (unpaged segments) or through the segment's page table.
use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::accessor::AccessType;
use crate::associative::{AssociativeMemory, SlotStatus};
use crate::descriptor::{PAGE_SIZE, PageDescriptor, SegmentDescriptor, split_page_offset};
use crate::fault::{AccessViolation, Fault};
use crate::memory::Memory;
use crate::processor::ProcessorConfiguration;
use crate::registers::ProcessorContext;

/// Key of a PTW associative memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageKey {
    pub segment: SegmentNumber,
    pub page: Unsigned18Bit,
}

fn offset_physical(base: PhysicalAddress, offset: u32) -> PhysicalAddress {
    PhysicalAddress::truncating_from(u64::from(base) + u64::from(offset))
}

fn read_physical<M: Memory>(
    mem: &mut M,
    addr: PhysicalAddress,
    what: &str,
) -> Result<Unsigned36Bit, Fault> {
    mem.read36(addr)
        .map_err(|e| Fault::nonexistent_memory(&e, what))
}

fn write_physical<M: Memory>(
    mem: &mut M,
    addr: PhysicalAddress,
    value: Unsigned36Bit,
    what: &str,
) -> Result<(), Fault> {
    mem.write36(addr, value)
        .map_err(|e| Fault::nonexistent_memory(&e, what))
}

fn violation(
    violation: AccessViolation,
    segment: SegmentNumber,
    offset: WordAddress,
    message: String,
) -> Fault {
    event!(
        Level::DEBUG,
        "access violation {} at {:o}|{:>06o}: {}",
        violation,
        segment,
        offset,
        message
    );
    Fault::access_violation(violation, segment, offset, message)
}

fn not_present(fault_code: Unsigned2Bit, message: String) -> Fault {
    event!(Level::DEBUG, "directed fault {}: {}", fault_code, message);
    Fault::directed(fault_code, message)
}

#[derive(Debug)]
pub struct AppendingUnit {
    sdwam: AssociativeMemory<SegmentNumber, SegmentDescriptor>,
    ptwam: AssociativeMemory<PageKey, PageDescriptor>,
    last_sdw: Option<SegmentDescriptor>,
}

impl AppendingUnit {
    pub fn new(config: &ProcessorConfiguration) -> AppendingUnit {
        AppendingUnit {
            sdwam: AssociativeMemory::new("SDWAM", config.sdwam_size, config.sdwam_enabled),
            ptwam: AssociativeMemory::new("PTWAM", config.ptwam_size, config.ptwam_enabled),
            last_sdw: None,
        }
    }

    /// The descriptor used by the most recent successful SDW fetch.
    pub fn last_sdw(&self) -> Option<&SegmentDescriptor> {
        self.last_sdw.as_ref()
    }

    pub fn clear_sdwam(&mut self) {
        self.sdwam.clear();
    }

    pub fn clear_ptwam(&mut self) {
        self.ptwam.clear();
    }

    /// Forget everything cached about `segment`: its SDW and the PTWs
    /// of its pages.
    pub fn invalidate_segment(&mut self, segment: SegmentNumber) {
        self.sdwam.invalidate(|s| *s == segment);
        self.ptwam.invalidate(|k| k.segment == segment);
    }

    pub fn sdwam_status(&self) -> Vec<SlotStatus<SegmentNumber, SegmentDescriptor>> {
        self.sdwam.status()
    }

    pub fn ptwam_status(&self) -> Vec<SlotStatus<PageKey, PageDescriptor>> {
        self.ptwam.status()
    }

    /// Locate the SDW of `segment` in core.
    fn sdw_address<M: Memory>(
        &self,
        regs: &ProcessorContext,
        mem: &mut M,
        segment: SegmentNumber,
        offset: WordAddress,
    ) -> Result<PhysicalAddress, Fault> {
        let dsbr = &regs.dsbr;
        let descriptor_offset: u32 = 2 * u32::from(segment);
        if descriptor_offset >= 16 * (u32::from(dsbr.bound) + 1) {
            return Err(violation(
                AccessViolation::OutOfSegmentBounds,
                segment,
                offset,
                format!(
                    "segment number {:o} is beyond the descriptor segment bound {:o}",
                    segment, dsbr.bound
                ),
            ));
        }
        if dsbr.unpaged {
            return Ok(offset_physical(dsbr.addr, descriptor_offset));
        }

        // The descriptor segment is itself paged.  These PTWs are not
        // kept in the PTW associative memory.
        let ptw_addr = offset_physical(dsbr.addr, descriptor_offset / PAGE_SIZE);
        let ptw = PageDescriptor::from_word(read_physical(
            mem,
            ptw_addr,
            "a descriptor segment page table word",
        )?);
        if !ptw.present {
            return Err(not_present(
                ptw.fault_code,
                format!(
                    "descriptor segment page {:o} (for segment {:o}) is not present",
                    descriptor_offset / PAGE_SIZE,
                    segment
                ),
            ));
        }
        Ok(offset_physical(
            ptw.page_base(),
            descriptor_offset % PAGE_SIZE,
        ))
    }

    fn fetch_sdw<M: Memory>(
        &mut self,
        regs: &ProcessorContext,
        mem: &mut M,
        segment: SegmentNumber,
        offset: WordAddress,
    ) -> Result<SegmentDescriptor, Fault> {
        if let Some(sdw) = self.sdwam.lookup(&segment) {
            return Ok(sdw);
        }
        let addr = self.sdw_address(regs, mem, segment, offset)?;
        let even = read_physical(mem, addr, "a segment descriptor")?;
        let odd = read_physical(mem, offset_physical(addr, 1), "a segment descriptor")?;
        let sdw = SegmentDescriptor::from_words(even, odd);
        event!(
            Level::TRACE,
            "fetched SDW for segment {:o} from {:>08o}: {:?}",
            segment,
            addr,
            sdw
        );
        if !sdw.present {
            return Err(not_present(
                sdw.fault_code,
                format!("segment {segment:o} is not present"),
            ));
        }
        self.sdwam.load(segment, sdw);
        Ok(sdw)
    }

    fn check_access(
        sdw: &SegmentDescriptor,
        ring: Ring,
        segment: SegmentNumber,
        offset: WordAddress,
        access: AccessType,
    ) -> Result<(), Fault> {
        if !sdw.rings_are_ordered() {
            return Err(violation(
                AccessViolation::IllegalRingOrder,
                segment,
                offset,
                format!(
                    "ring brackets {},{},{} are not in order",
                    sdw.r1, sdw.r2, sdw.r3
                ),
            ));
        }
        let (bracket_ok, permitted, out_of_bracket, off) = match access {
            AccessType::OperandRead | AccessType::IndirectWordFetch => (
                ring <= sdw.r2,
                sdw.read,
                AccessViolation::OutOfReadBracket,
                AccessViolation::ReadOff,
            ),
            AccessType::OperandWrite | AccessType::IndirectWordStore => (
                ring <= sdw.r1,
                sdw.write,
                AccessViolation::OutOfWriteBracket,
                AccessViolation::WriteOff,
            ),
            AccessType::InstructionFetch => (
                sdw.r1 <= ring && ring <= sdw.r2,
                sdw.execute,
                AccessViolation::OutOfExecuteBracket,
                AccessViolation::ExecuteOff,
            ),
        };
        if !bracket_ok {
            return Err(violation(
                out_of_bracket,
                segment,
                offset,
                format!(
                    "{access} in ring {ring} is outside the brackets {},{},{}",
                    sdw.r1, sdw.r2, sdw.r3
                ),
            ));
        }
        if !permitted {
            return Err(violation(
                off,
                segment,
                offset,
                format!("{access} is not permitted by the segment descriptor"),
            ));
        }
        if sdw.is_out_of_bounds(offset) {
            return Err(violation(
                AccessViolation::OutOfSegmentBounds,
                segment,
                offset,
                format!("offset is beyond the segment bound {:o}", sdw.bound),
            ));
        }
        Ok(())
    }

    /// Translate a reference to `offset` within `segment`, made from
    /// `ring`, into a physical address.
    pub fn translate<M: Memory>(
        &mut self,
        regs: &ProcessorContext,
        mem: &mut M,
        ring: Ring,
        segment: SegmentNumber,
        offset: WordAddress,
        access: AccessType,
    ) -> Result<PhysicalAddress, Fault> {
        let sdw = self.fetch_sdw(regs, mem, segment, offset)?;
        self.last_sdw = Some(sdw);
        AppendingUnit::check_access(&sdw, ring, segment, offset, access)?;

        if sdw.unpaged {
            let physical = offset_physical(sdw.addr, u32::from(offset));
            event!(
                Level::TRACE,
                "{:o}|{:>06o} is at {:>08o} (unpaged)",
                segment,
                offset,
                physical
            );
            return Ok(physical);
        }

        let (page, in_page) = split_page_offset(offset);
        let key = PageKey { segment, page };
        let ptw_addr = offset_physical(sdw.addr, u32::from(page));
        let mut ptw = match self.ptwam.lookup(&key) {
            Some(ptw) => ptw,
            None => {
                let word = read_physical(mem, ptw_addr, "a page table word")?;
                let mut ptw = PageDescriptor::from_word(word);
                if !ptw.present {
                    return Err(not_present(
                        ptw.fault_code,
                        format!("page {page:o} of segment {segment:o} is not present"),
                    ));
                }
                if !ptw.used {
                    write_physical(
                        mem,
                        ptw_addr,
                        PageDescriptor::mark_used(word),
                        "a page table word",
                    )?;
                    ptw.used = true;
                }
                self.ptwam.load(key, ptw);
                ptw
            }
        };

        if access.is_write() && !ptw.modified {
            // Set M in core, leaving the other bits as they are there.
            let word = read_physical(mem, ptw_addr, "a page table word")?;
            write_physical(
                mem,
                ptw_addr,
                PageDescriptor::mark_modified(word),
                "a page table word",
            )?;
            ptw.modified = true;
            self.ptwam.modify(&key, |cached| cached.modified = true);
        }

        let physical = offset_physical(ptw.page_base(), in_page);
        event!(
            Level::TRACE,
            "{:o}|{:>06o} is at {:>08o} (page {:o})",
            segment,
            offset,
            physical,
            page
        );
        Ok(physical)
    }
}
