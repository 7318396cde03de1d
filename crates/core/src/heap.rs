//! The `heap` module provides the noun store for the Nock interpreter.
//!
//! A noun is either an atom (a non-negative integer) or a cell (an ordered
//! pair of nouns). Every noun that the evaluator touches lives in the heap as
//! an entry addressed by an opaque `usize` index. Indices are stable only
//! until the next garbage collection (see `nock-runtime`'s `gc` module); after
//! a collection they are remapped and any index held outside the task stack
//! is stale.
//!
//! ## Representation
//!
//! The heap is three parallel growable arrays indexed identically:
//! - `tags`: `Tag::Atom` or `Tag::Cell`
//! - `slot1`: an atom's value, or a cell's head index
//! - `slot2`: unused for atoms, or a cell's tail index
//!
//! A fourth array, `generations`, tracks how many garbage collections an entry
//! has survived, for the generational collector in `nock-runtime`.
//!
//! Entries are never freed individually. The only ways `free` (the one-past-
//! last allocated index) moves backward are a compacting collection or
//! `reset`.

use crate::error::NockError;

/// Whether a heap entry is an atom or a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Atom,
    Cell,
}

/// The cell-granular noun store.
///
/// `NounHeap` owns every entry it has ever allocated; indices into it are weak
/// references that callers (the task stack, in practice) must keep reachable
/// across a potential garbage collection.
#[derive(Debug, Clone)]
pub struct NounHeap {
    tags: Vec<Tag>,
    slot1: Vec<u64>,
    slot2: Vec<u64>,
    generations: Vec<u8>,
    free: usize,
    capacity: usize,
}

/// Starting capacity for a heap constructed with `NounHeap::new`.
pub const DEFAULT_HEAP_CAPACITY: usize = 4096;

/// Generation counters saturate here; see the generational collector for why
/// a cap (rather than an unbounded counter) is what correctness requires.
pub const MAX_GENERATION: u8 = 2;

impl NounHeap {
    /// Construct an empty heap with `DEFAULT_HEAP_CAPACITY` slots reserved.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HEAP_CAPACITY)
    }

    /// Construct an empty heap with `capacity` slots reserved up front.
    pub fn with_capacity(capacity: usize) -> Self {
        NounHeap {
            tags: Vec::with_capacity(capacity),
            slot1: Vec::with_capacity(capacity),
            slot2: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free: 0,
            capacity,
        }
    }

    /// One past the last allocated index. Every valid index is in `0..free`.
    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    /// The number of slots currently reserved before the next growth.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocate a new atom entry. Does not itself trigger GC or growth; the
    /// evaluator's allocation path (in `nock-runtime`) is responsible for
    /// probing thresholds before calling this once capacity is known to
    /// suffice, or growing first.
    pub fn alloc_atom(&mut self, value: u64) -> Result<usize, NockError> {
        self.push_raw(Tag::Atom, value, 0)
    }

    /// Allocate a new cell entry referencing `head` and `tail`, which must
    /// already be valid indices (`< free()`).
    pub fn alloc_cell(&mut self, head: usize, tail: usize) -> Result<usize, NockError> {
        self.push_raw(Tag::Cell, head as u64, tail as u64)
    }

    fn push_raw(&mut self, tag: Tag, a: u64, b: u64) -> Result<usize, NockError> {
        if self.free >= self.capacity {
            return Err(NockError::HeapOverflow);
        }
        let idx = self.free;
        if idx == self.tags.len() {
            self.tags.push(tag);
            self.slot1.push(a);
            self.slot2.push(b);
            self.generations.push(0);
        } else {
            self.tags[idx] = tag;
            self.slot1[idx] = a;
            self.slot2[idx] = b;
            self.generations[idx] = 0;
        }
        self.free += 1;
        Ok(idx)
    }

    /// Whether the entry at `idx` is a cell.
    ///
    /// # Panics
    /// Panics if `idx >= free()`; callers inside this crate only ever pass
    /// indices they obtained from `alloc_*`, `slot`, or the task stack, all of
    /// which are checked against `free()` at the point they were produced.
    #[inline]
    pub fn is_cell(&self, idx: usize) -> bool {
        self.tags[idx] == Tag::Cell
    }

    /// The value of the atom at `idx`.
    pub fn value(&self, idx: usize) -> Result<u64, NockError> {
        if self.is_cell(idx) {
            return Err(NockError::TypeError { expected: "atom", index: idx });
        }
        Ok(self.slot1[idx])
    }

    /// The head index of the cell at `idx`.
    pub fn head(&self, idx: usize) -> Result<usize, NockError> {
        if !self.is_cell(idx) {
            return Err(NockError::TypeError { expected: "cell", index: idx });
        }
        Ok(self.slot1[idx] as usize)
    }

    /// The tail index of the cell at `idx`.
    pub fn tail(&self, idx: usize) -> Result<usize, NockError> {
        if !self.is_cell(idx) {
            return Err(NockError::TypeError { expected: "cell", index: idx });
        }
        Ok(self.slot2[idx] as usize)
    }

    /// Copy the entire entry record (tag plus both payload slots) from `src`
    /// into `dst`. This is the copy semantics ops 0 and 1 require: the
    /// destination becomes pointer-equal substructure to the source, which is
    /// observationally identical to a structural copy for the read-only
    /// nouns this interpreter produces.
    pub fn copy_entry(&mut self, src: usize, dst: usize) {
        self.tags[dst] = self.tags[src];
        self.slot1[dst] = self.slot1[src];
        self.slot2[dst] = self.slot2[src];
    }

    /// Overwrite `dst` with a freshly-tagged atom `value`. Used by the
    /// evaluator to write into pre-allocated result slots.
    pub fn write_atom(&mut self, dst: usize, value: u64) {
        self.tags[dst] = Tag::Atom;
        self.slot1[dst] = value;
        self.slot2[dst] = 0;
    }

    /// Overwrite `dst` with a cell `(head, tail)`.
    pub fn write_cell(&mut self, dst: usize, head: usize, tail: usize) {
        self.tags[dst] = Tag::Cell;
        self.slot1[dst] = head as u64;
        self.slot2[dst] = tail as u64;
    }

    /// Generation counter of the entry at `idx`, for the generational collector.
    #[inline]
    pub fn generation(&self, idx: usize) -> u8 {
        self.generations[idx]
    }

    /// The raw tag at `idx`, without the `Result`-returning type checks
    /// `is_cell` performs. Used by the collector, which already knows which
    /// indices are live and just needs to copy their tag across a
    /// compaction.
    #[inline]
    pub fn tag_raw(&self, idx: usize) -> Tag {
        self.tags[idx]
    }

    /// The raw two payload words at `idx` (an atom's value and an unused
    /// zero, or a cell's head/tail indices), without tag checking. Used by
    /// the collector to copy entries wholesale during compaction.
    #[inline]
    pub fn slots_raw(&self, idx: usize) -> (u64, u64) {
        (self.slot1[idx], self.slot2[idx])
    }

    /// Mutable access to the per-entry generation counters, for the
    /// generational collector to bump or cap after a surviving collection.
    #[inline]
    pub fn generations_mut(&mut self) -> &mut Vec<u8> {
        &mut self.generations
    }

    /// Grow the backing arrays so `capacity` reaches at least `new_capacity`.
    /// Indices are preserved: growth never moves an existing entry.
    pub fn grow_to(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity {
            return;
        }
        self.tags.reserve(new_capacity - self.tags.capacity().min(new_capacity));
        self.slot1.reserve(new_capacity);
        self.slot2.reserve(new_capacity);
        self.generations.reserve(new_capacity);
        self.capacity = new_capacity;
    }

    /// Replace the live set with `new_tags`/`new_slot1`/`new_slot2`/
    /// `new_generations`, all of length `new_free`. Used exclusively by the
    /// compacting collector in `nock-runtime` after it has computed the
    /// relocation map; not part of the public noun-store contract.
    pub fn install_compacted(
        &mut self,
        new_tags: Vec<Tag>,
        new_slot1: Vec<u64>,
        new_slot2: Vec<u64>,
        new_generations: Vec<u8>,
    ) {
        debug_assert_eq!(new_tags.len(), new_slot1.len());
        debug_assert_eq!(new_tags.len(), new_slot2.len());
        debug_assert_eq!(new_tags.len(), new_generations.len());
        self.free = new_tags.len();
        self.tags = new_tags;
        self.slot1 = new_slot1;
        self.slot2 = new_slot2;
        self.generations = new_generations;
    }

    /// Zero `free` and drop every entry. All prior indices become invalid.
    pub fn reset(&mut self) {
        self.tags.clear();
        self.slot1.clear();
        self.slot2.clear();
        self.generations.clear();
        self.free = 0;
    }
}

impl Default for NounHeap {
    fn default() -> Self {
        Self::new()
    }
}
