//! Associative memories for segment and page descriptors.
//!
//! Each associative memory is a small fully-associative cache.  Every
//! slot carries a usage counter; the counters of all slots are always
//! a permutation of `0..capacity`, with `capacity-1` marking the most
//! recently used slot.  The least recently used full slot (or the
//! empty slot with the lowest count) is the one replaced on a load.
use std::fmt::Debug;

use serde::Serialize;
use tracing::{event, Level};

/// Default number of slots in each associative memory.
pub const DEFAULT_ASSOCIATIVE_MEMORY_SIZE: usize = 64;

#[derive(Debug, Clone)]
struct Slot<K, V> {
    usage: usize,
    entry: Option<(K, V)>,
}

/// The state of one slot, for display by a front panel or a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus<K, V> {
    pub slot: usize,
    pub full: bool,
    pub usage: usize,
    pub key: Option<K>,
    pub value: Option<V>,
}

#[derive(Debug, Clone)]
pub struct AssociativeMemory<K, V> {
    name: &'static str,
    slots: Vec<Slot<K, V>>,
    enabled: bool,
}

impl<K, V> AssociativeMemory<K, V>
where
    K: Copy + Eq + Debug,
    V: Copy + Debug,
{
    pub fn new(name: &'static str, capacity: usize, enabled: bool) -> AssociativeMemory<K, V> {
        AssociativeMemory {
            name,
            slots: (0..capacity)
                .map(|usage| Slot { usage, entry: None })
                .collect(),
            enabled,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the associative memory.  Disabling it also
    /// empties it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(&slot.entry, Some((k, _)) if k == key))
    }

    /// Make `index` the most recently used slot.
    fn touch(&mut self, index: usize) {
        let top = self.slots.len() - 1;
        let previous = self.slots[index].usage;
        for slot in self.slots.iter_mut() {
            if slot.usage > previous {
                slot.usage -= 1;
            }
        }
        self.slots[index].usage = top;
    }

    /// Look up `key`, counting a hit as a use of the slot.
    pub fn lookup(&mut self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }
        match self.position(key) {
            Some(index) => {
                self.touch(index);
                let value = self.slots[index].entry.map(|(_, v)| v);
                event!(
                    Level::TRACE,
                    "{}: hit for {:?} in slot {}",
                    self.name,
                    key,
                    index
                );
                value
            }
            None => {
                event!(Level::TRACE, "{}: miss for {:?}", self.name, key);
                None
            }
        }
    }

    fn victim(&self) -> usize {
        let empty = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_none())
            .min_by_key(|(_, slot)| slot.usage)
            .map(|(index, _)| index);
        match empty {
            Some(index) => index,
            None => self
                .slots
                .iter()
                .position(|slot| slot.usage == 0)
                .unwrap_or(0),
        }
    }

    /// Load `value` under `key`, replacing any entry already held for
    /// `key`.  Returns the entry which was evicted to make room, if
    /// any.
    pub fn load(&mut self, key: K, value: V) -> Option<(K, V)> {
        if !self.enabled || self.slots.is_empty() {
            return None;
        }
        let (index, evicted) = match self.position(&key) {
            Some(index) => (index, None),
            None => {
                let index = self.victim();
                (index, self.slots[index].entry)
            }
        };
        self.slots[index].entry = Some((key, value));
        self.touch(index);
        match &evicted {
            Some((old_key, _)) => {
                event!(
                    Level::DEBUG,
                    "{}: loaded {:?} into slot {}, evicting {:?}",
                    self.name,
                    key,
                    index,
                    old_key
                );
            }
            None => {
                event!(
                    Level::DEBUG,
                    "{}: loaded {:?} into slot {}",
                    self.name,
                    key,
                    index
                );
            }
        }
        evicted
    }

    /// Update the cached value for `key` in place, without counting
    /// this as a use.  Returns false if `key` is not present.
    pub fn modify<F>(&mut self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        match self.position(key) {
            Some(index) => {
                if let Some((_, value)) = self.slots[index].entry.as_mut() {
                    f(value);
                }
                true
            }
            None => false,
        }
    }

    /// Empty every slot whose key matches `pred`.  Usage counters are
    /// left alone, so they remain a permutation.
    pub fn invalidate<P>(&mut self, pred: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut count = 0;
        for slot in self.slots.iter_mut() {
            if matches!(&slot.entry, Some((k, _)) if pred(k)) {
                slot.entry = None;
                count += 1;
            }
        }
        if count > 0 {
            event!(
                Level::DEBUG,
                "{}: invalidated {} entries",
                self.name,
                count
            );
        }
        count
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.entry = None;
        }
        event!(Level::DEBUG, "{}: cleared", self.name);
    }

    pub fn status(&self) -> Vec<SlotStatus<K, V>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotStatus {
                slot: index,
                full: slot.entry.is_some(),
                usage: slot.usage,
                key: slot.entry.map(|(k, _)| k),
                value: slot.entry.map(|(_, v)| v),
            })
            .collect()
    }
}
