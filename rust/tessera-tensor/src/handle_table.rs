//! Slot + generation registry that issues `u64` handles for owned values.
//!
//! A handle packs the slot index in the upper 32 bits and the slot's generation
//! in the lower 32 bits. Releasing a value bumps the generation, so a stale
//! handle never resolves to a value that later reuses the same slot.

#[inline]
fn pack(index: u32, generation: u32) -> u64 {
    ((index as u64) << 32) | generation as u64
}

#[inline]
fn unpack(handle: u64) -> (u32, u32) {
    ((handle >> 32) as u32, handle as u32)
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        HandleTable {
            entries: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value` and returns its handle; `None` once every slot index is in use.
    pub fn insert(&mut self, value: T) -> Option<u64> {
        let handle = match self.vacant.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.value = Some(value);
                pack(index, entry.generation)
            }
            None => {
                let index = u32::try_from(self.entries.len()).ok()?;
                self.entries.push(Entry {
                    generation: 0,
                    value: Some(value),
                });
                pack(index, 0)
            }
        };
        self.live += 1;
        Some(handle)
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        let (index, generation) = unpack(handle);
        let entry = self.entries.get(index as usize)?;
        (entry.generation == generation)
            .then_some(entry.value.as_ref())
            .flatten()
    }

    pub fn contains(&self, handle: u64) -> bool {
        self.get(handle).is_some()
    }

    /// Removes and returns the value behind `handle`; `None` for stale or unknown handles.
    ///
    /// A slot whose generation wraps around to zero is retired instead of reused.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let (index, generation) = unpack(handle);
        let entry = self.entries.get_mut(index as usize)?;
        if entry.generation != generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.vacant.push(index);
        }
        self.live -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (pack(index as u32, entry.generation), value))
        })
    }
}
