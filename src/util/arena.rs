//! Generation-checked slot arena for wait-queue nodes.
//!
//! Queue nodes are linked by index rather than by pointer. Each slot carries
//! a generation counter that is bumped when the slot is vacated, so a stale
//! [`ArenaIndex`] held by a thread that was cancelled or already dequeued can
//! never alias a node allocated later in the same slot.
//!
//! # Design
//!
//! - Elements are stored in a `Vec` with generation counters for ABA safety
//! - Vacated slots are threaded onto a free list for reuse
//! - No unsafe code; relies on bounds checking and generation validation

use core::fmt;
use core::ops::{Index, IndexMut};

/// An index into an arena with a generation counter for ABA safety.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex {
    index: u32,
    generation: u32,
}

impl ArenaIndex {
    /// Creates a new arena index (primarily for testing).
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the raw slot number.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaIndex({}:{})", self.index, self.generation)
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied { value: T, generation: u32 },
    Vacant { next_free: Option<u32>, generation: u32 },
}

/// A slot arena with generation-based indices.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates a new empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Creates a new arena with room for `capacity` values before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the arena has no occupied slots.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a value and returns its index, reusing a vacated slot if one exists.
    pub fn insert(&mut self, value: T) -> ArenaIndex {
        self.len += 1;
        if let Some(free) = self.free_head {
            let slot = &mut self.slots[free as usize];
            let Slot::Vacant {
                next_free,
                generation,
            } = *slot
            else {
                unreachable!("free list pointed to occupied slot")
            };
            self.free_head = next_free;
            *slot = Slot::Occupied { value, generation };
            return ArenaIndex {
                index: free,
                generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("arena overflow");
        self.slots.push(Slot::Occupied {
            value,
            generation: 0,
        });
        ArenaIndex {
            index,
            generation: 0,
        }
    }

    /// Removes the value at `index`, bumping the slot generation.
    ///
    /// Returns `None` if the index is stale or the slot is vacant.
    pub fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let slot = self.slots.get_mut(index.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == index.generation => {
                let vacant = Slot::Vacant {
                    next_free: self.free_head,
                    generation: generation.wrapping_add(1),
                };
                let Slot::Occupied { value, .. } = core::mem::replace(slot, vacant) else {
                    unreachable!()
                };
                self.free_head = Some(index.index);
                self.len -= 1;
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns a reference to the value at `index`, if it is still live.
    #[inline]
    #[must_use]
    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        match self.slots.get(index.index as usize)? {
            Slot::Occupied { value, generation } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value at `index`, if it is still live.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        match self.slots.get_mut(index.index as usize)? {
            Slot::Occupied { value, generation } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Returns true if the index points to a live slot.
    #[must_use]
    pub fn contains(&self, index: ArenaIndex) -> bool {
        self.get(index).is_some()
    }
}

impl<T> Index<ArenaIndex> for Arena<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: ArenaIndex) -> &T {
        self.get(index).expect("stale arena index")
    }
}

impl<T> IndexMut<ArenaIndex> for Arena<T> {
    #[track_caller]
    fn index_mut(&mut self, index: ArenaIndex) -> &mut T {
        self.get_mut(index).expect("stale arena index")
    }
}
