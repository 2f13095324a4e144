//! ## minnespool-core::segment
//! **Segment arena and address-ordered segment list**
//!
//! Segment records live in a growable slot arena and are addressed by
//! stable `SegmentId` indices rather than raw pointers. Retired slots go
//! onto a free-slot list and are reused before the arena grows. The live
//! records form a doubly-linked list ordered by buffer offset which
//! exactly tiles the backing buffer: no holes, no overlaps.

use crate::error::PoolError;

/// Fill factor above which a backing table doubles.
pub(crate) const FILL_FACTOR: f64 = 0.75;
/// Capacity multiplier applied when a backing table grows.
pub(crate) const EXPAND_FACTOR: usize = 2;
/// Initial slot capacity of the segment arena.
const ARENA_INIT_CAPACITY: usize = 40;

/// Stable index of one segment record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SegmentId(pub(crate) u32);

impl SegmentId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One segment record: a contiguous tagged span of the backing buffer.
#[derive(Debug, Clone)]
pub(crate) struct SegmentRecord {
    pub offset: usize,
    pub size: usize,
    pub allocated: bool,
    pub in_use: bool,
    pub generation: u64,
    pub next: Option<SegmentId>,
    pub prev: Option<SegmentId>,
}

impl SegmentRecord {
    /// A free, live, unlinked record covering `size` bytes at `offset`.
    pub fn gap(offset: usize, size: usize) -> Self {
        Self {
            offset,
            size,
            allocated: false,
            in_use: true,
            generation: 0,
            next: None,
            prev: None,
        }
    }
}

pub(crate) struct SegmentArena {
    slots: Vec<SegmentRecord>,
    retired: Vec<SegmentId>,
    live: usize,
    head: SegmentId,
}

impl SegmentArena {
    /// Seeds the arena with one free segment spanning the whole buffer.
    pub fn with_initial(total_size: usize) -> Result<(Self, SegmentId), PoolError> {
        let mut slots = Vec::new();
        slots
            .try_reserve(ARENA_INIT_CAPACITY)
            .map_err(|_| PoolError::AllocationFailed {
                requested: ARENA_INIT_CAPACITY,
            })?;
        slots.push(SegmentRecord::gap(0, total_size));
        let head = SegmentId(0);
        let arena = Self {
            slots,
            retired: Vec::new(),
            live: 1,
            head,
        };
        Ok((arena, head))
    }

    pub fn head(&self) -> SegmentId {
        self.head
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// # Panics
    /// When `id` names a retired slot: live code must never hold an id
    /// across the slot's retirement.
    pub fn get(&self, id: SegmentId) -> &SegmentRecord {
        let rec = &self.slots[id.index()];
        assert!(rec.in_use, "segment arena out of step: slot {} is retired", id.0);
        rec
    }

    pub fn get_mut(&mut self, id: SegmentId) -> &mut SegmentRecord {
        let rec = &mut self.slots[id.index()];
        assert!(rec.in_use, "segment arena out of step: slot {} is retired", id.0);
        rec
    }

    /// Makes sure one more record can be placed without the slot table
    /// reallocating mid-mutation. Past the fill factor the table doubles;
    /// reservation failure surfaces before any list state has changed.
    pub fn ensure_slot_available(&mut self) -> Result<(), PoolError> {
        if !self.retired.is_empty() {
            return Ok(());
        }
        let capacity = self.slots.capacity();
        if (self.slots.len() + 1) as f64 > capacity as f64 * FILL_FACTOR {
            let target = capacity * EXPAND_FACTOR;
            self.slots
                .try_reserve(target - self.slots.len())
                .map_err(|_| PoolError::AllocationFailed { requested: target })?;
        }
        Ok(())
    }

    /// Places a record, reusing a retired slot when one exists. Callers
    /// run `ensure_slot_available` first, so the append cannot fail.
    pub fn acquire(&mut self, record: SegmentRecord) -> SegmentId {
        debug_assert!(record.in_use);
        self.live += 1;
        match self.retired.pop() {
            Some(id) => {
                self.slots[id.index()] = record;
                id
            }
            None => {
                let id = SegmentId(self.slots.len() as u32);
                self.slots.push(record);
                id
            }
        }
    }

    /// Returns a slot to the free-slot list. The record must already be
    /// unlinked from the live list.
    pub fn retire(&mut self, id: SegmentId) {
        let rec = &mut self.slots[id.index()];
        assert!(rec.in_use, "segment arena out of step: double retire of slot {}", id.0);
        debug_assert!(rec.next.is_none() && rec.prev.is_none());
        rec.in_use = false;
        self.live -= 1;
        self.retired.push(id);
    }

    /// Splices `new` into the list immediately after `anchor`.
    pub fn link_after(&mut self, anchor: SegmentId, new: SegmentId) {
        let anchor_next = self.get(anchor).next;
        {
            let rec = self.get_mut(new);
            rec.prev = Some(anchor);
            rec.next = anchor_next;
        }
        if let Some(next) = anchor_next {
            self.get_mut(next).prev = Some(new);
        }
        self.get_mut(anchor).next = Some(new);
    }

    /// Splices `id` out of the list, leaving its slot live but unlinked.
    pub fn unlink(&mut self, id: SegmentId) {
        let (prev, next) = {
            let rec = self.get(id);
            (rec.prev, rec.next)
        };
        match prev {
            Some(prev) => self.get_mut(prev).next = next,
            None => match next {
                Some(next) => self.head = next,
                None => panic!("segment arena out of step: unlinking the only live segment"),
            },
        }
        if let Some(next) = next {
            self.get_mut(next).prev = prev;
        }
        let rec = self.get_mut(id);
        rec.next = None;
        rec.prev = None;
    }

    /// Live records in buffer-address order.
    pub fn iter(&self) -> SegmentIter<'_> {
        SegmentIter {
            arena: self,
            cursor: Some(self.head),
        }
    }
}

pub(crate) struct SegmentIter<'a> {
    arena: &'a SegmentArena,
    cursor: Option<SegmentId>,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = (SegmentId, &'a SegmentRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let rec = self.arena.get(id);
        self.cursor = rec.next;
        Some((id, rec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(arena: &SegmentArena) -> Vec<usize> {
        arena.iter().map(|(_, rec)| rec.offset).collect()
    }

    #[test]
    fn test_initial_arena_holds_one_spanning_gap() {
        let (arena, head) = SegmentArena::with_initial(100).unwrap();
        assert_eq!(arena.live_count(), 1);
        let rec = arena.get(head);
        assert_eq!((rec.offset, rec.size), (0, 100));
        assert!(!rec.allocated);
        assert!(rec.next.is_none() && rec.prev.is_none());
    }

    #[test]
    fn test_link_after_keeps_address_order() {
        let (mut arena, head) = SegmentArena::with_initial(100).unwrap();
        arena.ensure_slot_available().unwrap();
        let tail = arena.acquire(SegmentRecord::gap(60, 40));
        arena.link_after(head, tail);
        arena.ensure_slot_available().unwrap();
        let mid = arena.acquire(SegmentRecord::gap(30, 30));
        arena.link_after(head, mid);

        assert_eq!(offsets(&arena), vec![0, 30, 60]);
        assert_eq!(arena.live_count(), 3);
    }

    #[test]
    fn test_unlink_middle_segment() {
        let (mut arena, head) = SegmentArena::with_initial(100).unwrap();
        arena.ensure_slot_available().unwrap();
        let mid = arena.acquire(SegmentRecord::gap(50, 25));
        arena.link_after(head, mid);
        arena.ensure_slot_available().unwrap();
        let tail = arena.acquire(SegmentRecord::gap(75, 25));
        arena.link_after(mid, tail);

        arena.unlink(mid);
        arena.retire(mid);

        assert_eq!(offsets(&arena), vec![0, 75]);
        assert_eq!(arena.get(head).next, Some(tail));
        assert_eq!(arena.get(tail).prev, Some(head));
    }

    #[test]
    fn test_retired_slots_are_reused_before_growth() {
        let (mut arena, head) = SegmentArena::with_initial(100).unwrap();
        arena.ensure_slot_available().unwrap();
        let first = arena.acquire(SegmentRecord::gap(80, 20));
        arena.link_after(head, first);
        arena.unlink(first);
        arena.retire(first);

        arena.ensure_slot_available().unwrap();
        let second = arena.acquire(SegmentRecord::gap(90, 10));
        assert_eq!(second, first);
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    #[should_panic(expected = "retired")]
    fn test_access_to_retired_slot_panics() {
        let (mut arena, head) = SegmentArena::with_initial(100).unwrap();
        arena.ensure_slot_available().unwrap();
        let extra = arena.acquire(SegmentRecord::gap(50, 50));
        arena.link_after(head, extra);
        arena.unlink(extra);
        arena.retire(extra);
        let _ = arena.get(extra);
    }
}
