//! Physical memory.
//!
//! Main memory is a flat array of 36-bit words addressed by a 24-bit
//! physical address.  The processor only ever reaches it through the
//! [`Memory`] trait, so a test can substitute a tiny memory and
//! several processors can share one store through [`SharedMemory`].
use std::error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{event, Level};

use base::prelude::*;

/// The largest memory the 24-bit physical address can reach.
pub const MAX_MEMORY_WORDS: usize = 1 << 24;

/// Memory size used when no configuration says otherwise.
pub const DEFAULT_MEMORY_WORDS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOpFailure {
    /// There is no memory at this address.
    NotMapped(PhysicalAddress),
}

impl Display for MemoryOpFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MemoryOpFailure::NotMapped(addr) => {
                write!(f, "address {addr:o} is not mapped to functioning memory")
            }
        }
    }
}

impl error::Error for MemoryOpFailure {}

/// The interface between the processor and physical memory.
pub trait Memory {
    /// Fetch a word.
    fn read36(&mut self, addr: PhysicalAddress) -> Result<Unsigned36Bit, MemoryOpFailure>;

    /// Store a word.
    fn write36(&mut self, addr: PhysicalAddress, value: Unsigned36Bit)
        -> Result<(), MemoryOpFailure>;

    /// Number of words of memory.
    fn size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfiguration {
    /// Number of words of main memory.  Values above
    /// [`MAX_MEMORY_WORDS`] are reduced to it.
    pub size_words: usize,
}

impl Default for MemoryConfiguration {
    fn default() -> MemoryConfiguration {
        MemoryConfiguration {
            size_words: DEFAULT_MEMORY_WORDS,
        }
    }
}

/// Main memory owned by a single processor (or a single test).
pub struct MainMemory {
    words: Vec<Unsigned36Bit>,
}

impl MemoryConfiguration {
    /// The number of words actually provided.
    pub fn effective_size(&self) -> usize {
        self.size_words.min(MAX_MEMORY_WORDS)
    }
}

impl MainMemory {
    pub fn new(config: &MemoryConfiguration) -> MainMemory {
        let size = config.effective_size();
        if size < config.size_words {
            event!(
                Level::WARN,
                "requested memory size {} exceeds the physical address space; using {} words",
                config.size_words,
                size
            );
        }
        MainMemory {
            words: vec![Unsigned36Bit::ZERO; size],
        }
    }

    fn offset(&self, addr: PhysicalAddress) -> Result<usize, MemoryOpFailure> {
        let offset = usize::from(addr);
        if offset < self.words.len() {
            Ok(offset)
        } else {
            Err(MemoryOpFailure::NotMapped(addr))
        }
    }
}

impl Memory for MainMemory {
    fn read36(&mut self, addr: PhysicalAddress) -> Result<Unsigned36Bit, MemoryOpFailure> {
        let offset = self.offset(addr)?;
        Ok(self.words[offset])
    }

    fn write36(
        &mut self,
        addr: PhysicalAddress,
        value: Unsigned36Bit,
    ) -> Result<(), MemoryOpFailure> {
        let offset = self.offset(addr)?;
        self.words[offset] = value;
        Ok(())
    }

    fn size(&self) -> usize {
        self.words.len()
    }
}

impl Debug for MainMemory {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        // The contents are far too large to be useful in a log.
        f.debug_struct("MainMemory")
            .field("size", &self.words.len())
            .finish()
    }
}

/// Main memory shared between processors.  Every access takes the one
/// lock, so each `read36` or `write36` is atomic with respect to the
/// other processors.  Sequences of accesses (for example a tally word
/// fetch and its rewrite) are not.
#[derive(Clone, Debug)]
pub struct SharedMemory {
    inner: Arc<Mutex<MainMemory>>,
}

impl SharedMemory {
    pub fn new(memory: MainMemory) -> SharedMemory {
        SharedMemory {
            inner: Arc::new(Mutex::new(memory)),
        }
    }

    fn with_memory<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut MainMemory) -> T,
    {
        // A processor which panicked while holding the lock cannot
        // have left a word half-written, so the contents are still
        // usable.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }
}

impl Memory for SharedMemory {
    fn read36(&mut self, addr: PhysicalAddress) -> Result<Unsigned36Bit, MemoryOpFailure> {
        self.with_memory(|mem| mem.read36(addr))
    }

    fn write36(
        &mut self,
        addr: PhysicalAddress,
        value: Unsigned36Bit,
    ) -> Result<(), MemoryOpFailure> {
        self.with_memory(|mem| mem.write36(addr, value))
    }

    fn size(&self) -> usize {
        self.with_memory(|mem| mem.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn small() -> MemoryConfiguration {
        MemoryConfiguration { size_words: 0o100 }
    }

    #[test]
    fn test_read_write() {
        let mut mem = MainMemory::new(&small());
        assert_eq!(mem.size(), 0o100);
        let addr = u24!(0o17);
        assert_eq!(mem.read36(addr), Ok(Unsigned36Bit::ZERO));
        mem.write36(addr, u36!(0o123_456_701_234))
            .expect("address is mapped");
        assert_eq!(mem.read36(addr), Ok(u36!(0o123_456_701_234)));
    }

    #[test]
    fn test_not_mapped() {
        let mut mem = MainMemory::new(&small());
        let addr = u24!(0o100);
        assert_eq!(mem.read36(addr), Err(MemoryOpFailure::NotMapped(addr)));
        assert_eq!(
            mem.write36(addr, Unsigned36Bit::ONE),
            Err(MemoryOpFailure::NotMapped(addr))
        );
    }

    #[test]
    fn test_size_is_capped() {
        let config = MemoryConfiguration {
            size_words: MAX_MEMORY_WORDS + 1,
        };
        assert_eq!(config.effective_size(), MAX_MEMORY_WORDS);
        assert_eq!(small().effective_size(), 0o100);
    }

    #[test]
    fn test_shared_memory_is_shared() {
        let shared = SharedMemory::new(MainMemory::new(&small()));
        let handles: Vec<_> = (0..4_u8)
            .map(|n| {
                let mut mem = shared.clone();
                thread::spawn(move || {
                    let addr = PhysicalAddress::from(n);
                    mem.write36(addr, Unsigned36Bit::from(n + 1))
                        .expect("address is mapped");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread should not panic");
        }
        let mut reader = shared.clone();
        for n in 0..4_u8 {
            assert_eq!(
                reader.read36(PhysicalAddress::from(n)),
                Ok(Unsigned36Bit::from(n + 1))
            );
        }
    }
}
