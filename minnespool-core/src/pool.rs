//! ## minnespool-core::pool
//! **Pool manager: placement, split and coalesce over one backing buffer**
//!
//! A `Pool` owns a fixed backing buffer, the segment arena tiling it and
//! the gap index answering fit queries, and keeps all three in step
//! across every `allocate`/`release`. Placement follows the policy fixed
//! at creation; releases coalesce with free neighbors so no two adjacent
//! gaps ever survive an operation.
//!
//! ### Expectations (Production):
//! - No mutation on any failed call: errors leave the pool untouched
//! - Internal tables grow before the mutation that needs them
//! - Stale handles rejected via per-allocation generation tags

use std::fmt;

use tracing::{debug, trace};

use crate::error::PoolError;
use crate::gap_index::{GapEntry, GapIndex};
use crate::policy::PlacementPolicy;
use crate::segment::{SegmentArena, SegmentId, SegmentRecord};
use crate::stats::PoolStats;

/// Opaque reference to one allocated segment.
///
/// Carries the segment's buffer offset plus the generation stamped when
/// the allocation was placed. Release checks both, so a handle kept
/// across a release and a later reuse of the same offset is rejected
/// instead of freeing a stranger's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocHandle {
    offset: usize,
    size: usize,
    generation: u64,
}

impl AllocHandle {
    /// Start of the allocated span within the pool's buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the allocated span in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// One row of an [`Pool::inspect`] snapshot, in buffer-address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentView {
    pub size: usize,
    pub allocated: bool,
}

/// One independently managed backing buffer plus its bookkeeping.
pub struct Pool {
    buffer: Box<[u8]>,
    arena: SegmentArena,
    gaps: GapIndex,
    policy: PlacementPolicy,
    total_size: usize,
    allocated_bytes: usize,
    allocation_count: usize,
    free_segment_count: usize,
    next_generation: u64,
}

impl Pool {
    /// Reserves a backing buffer of `size` bytes and seeds the arena and
    /// gap index with the single spanning gap.
    pub fn open(size: usize, policy: PlacementPolicy) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::AllocationFailed { requested: 0 });
        }
        let mut backing = Vec::new();
        backing
            .try_reserve_exact(size)
            .map_err(|_| PoolError::AllocationFailed { requested: size })?;
        backing.resize(size, 0u8);

        let (arena, spanning) = SegmentArena::with_initial(size)?;
        let mut gaps = GapIndex::new()?;
        gaps.insert(GapEntry {
            size,
            offset: 0,
            segment: spanning,
        });

        debug!(size, policy = %policy, "pool opened");
        Ok(Self {
            buffer: backing.into_boxed_slice(),
            arena,
            gaps,
            policy,
            total_size: size,
            allocated_bytes: 0,
            allocation_count: 0,
            free_segment_count: 1,
            next_generation: 1,
        })
    }

    /// Consumes the pool. Refused while any allocation is live: the pool
    /// is handed back intact so nothing is silently freed.
    pub fn close(self) -> Result<(), (Pool, PoolError)> {
        if self.is_pristine() {
            debug!(size = self.total_size, "pool closed");
            Ok(())
        } else {
            let live = self.allocation_count;
            Err((self, PoolError::PoolNotEmpty { live }))
        }
    }

    /// Places `req_size` bytes in a gap chosen by the pool's policy.
    ///
    /// Fails with `NoFitFound` when no gap is large enough and with
    /// `AllocationFailed` when an internal table cannot grow; neither
    /// failure mutates the pool.
    pub fn allocate(&mut self, req_size: usize) -> Result<AllocHandle, PoolError> {
        if req_size == 0 {
            return Err(PoolError::AllocationFailed { requested: 0 });
        }
        match self.gaps.largest() {
            Some(gap) if gap.size >= req_size => {}
            _ => return Err(PoolError::NoFitFound { requested: req_size }),
        }
        // Grow both tables up front so the mutation below cannot fail
        // half-way through.
        self.arena.ensure_slot_available()?;
        self.gaps.ensure_room()?;

        let candidate = match self.policy {
            PlacementPolicy::FirstFit => self.first_fit(req_size),
            PlacementPolicy::BestFit => self.gaps.best_fit(req_size),
        }
        .expect("segment list out of step with gap index: sufficient gap vanished");

        let (offset, candidate_size) = {
            let rec = self.arena.get(candidate);
            (rec.offset, rec.size)
        };
        let generation = self.next_generation;
        self.next_generation += 1;

        self.gaps.remove(candidate);
        {
            let rec = self.arena.get_mut(candidate);
            rec.allocated = true;
            rec.size = req_size;
            rec.generation = generation;
        }
        if candidate_size > req_size {
            // Split: the remainder becomes a new gap right after us.
            let remainder = candidate_size - req_size;
            let gap_id = self.arena.acquire(SegmentRecord::gap(offset + req_size, remainder));
            self.arena.link_after(candidate, gap_id);
            self.gaps.insert(GapEntry {
                size: remainder,
                offset: offset + req_size,
                segment: gap_id,
            });
        } else {
            self.free_segment_count -= 1;
        }

        self.allocated_bytes += req_size;
        self.allocation_count += 1;
        trace!(offset, size = req_size, "placed allocation");

        #[cfg(debug_assertions)]
        self.validate();

        Ok(AllocHandle {
            offset,
            size: req_size,
            generation,
        })
    }

    /// Releases the allocation behind `handle` and coalesces the freed
    /// span with free neighbors, forward then backward. Exactly one gap
    /// index entry describes the merged result.
    pub fn release(&mut self, handle: AllocHandle) -> Result<(), PoolError> {
        let target = self
            .find_allocated(handle.offset)
            .ok_or(PoolError::InvalidHandle {
                offset: handle.offset,
            })?;
        if self.arena.get(target).generation != handle.generation {
            return Err(PoolError::InvalidHandle {
                offset: handle.offset,
            });
        }
        self.gaps.ensure_room()?;

        let freed_size = self.arena.get(target).size;
        self.arena.get_mut(target).allocated = false;
        self.allocated_bytes -= freed_size;
        self.allocation_count -= 1;
        self.free_segment_count += 1;

        // Forward merge: absorb a free successor.
        let mut survivor = target;
        if let Some(next) = self.arena.get(survivor).next {
            if !self.arena.get(next).allocated {
                self.gaps.remove(next);
                let absorbed = self.arena.get(next).size;
                self.arena.get_mut(survivor).size += absorbed;
                self.arena.unlink(next);
                self.arena.retire(next);
                self.free_segment_count -= 1;
            }
        }
        // Backward merge: fold the freed span into a free predecessor.
        if let Some(prev) = self.arena.get(survivor).prev {
            if !self.arena.get(prev).allocated {
                self.gaps.remove(prev);
                let absorbed = self.arena.get(survivor).size;
                self.arena.get_mut(prev).size += absorbed;
                self.arena.unlink(survivor);
                self.arena.retire(survivor);
                self.free_segment_count -= 1;
                survivor = prev;
            }
        }

        let (size, offset) = {
            let rec = self.arena.get(survivor);
            (rec.size, rec.offset)
        };
        self.gaps.insert(GapEntry {
            size,
            offset,
            segment: survivor,
        });
        trace!(offset = handle.offset, size = freed_size, "released allocation");

        #[cfg(debug_assertions)]
        self.validate();

        Ok(())
    }

    /// Address-ordered snapshot of the live segment list. Read-only.
    pub fn inspect(&self) -> Vec<SegmentView> {
        self.arena
            .iter()
            .map(|(_, rec)| SegmentView {
                size: rec.size,
                allocated: rec.allocated,
            })
            .collect()
    }

    /// Handle-validated view of the allocated span.
    pub fn bytes(&self, handle: &AllocHandle) -> Result<&[u8], PoolError> {
        let rec = self.checked_record(handle)?;
        Ok(&self.buffer[rec.offset..rec.offset + rec.size])
    }

    /// Handle-validated mutable view of the allocated span.
    pub fn bytes_mut(&mut self, handle: &AllocHandle) -> Result<&mut [u8], PoolError> {
        let (offset, size) = {
            let rec = self.checked_record(handle)?;
            (rec.offset, rec.size)
        };
        Ok(&mut self.buffer[offset..offset + size])
    }

    /// Point-in-time counters for reporting layers.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_size: self.total_size,
            allocated_bytes: self.allocated_bytes,
            allocation_count: self.allocation_count,
            free_segment_count: self.free_segment_count,
            largest_gap: self.gaps.largest().map(|gap| gap.size).unwrap_or(0),
        }
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    pub fn free_segment_count(&self) -> usize {
        self.free_segment_count
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    /// True when the whole buffer is one free segment: the only state in
    /// which [`Pool::close`] succeeds.
    pub fn is_pristine(&self) -> bool {
        self.allocation_count == 0 && self.free_segment_count == 1
    }

    /// First sufficient gap in buffer-address order.
    fn first_fit(&self, req_size: usize) -> Option<SegmentId> {
        self.arena
            .iter()
            .find(|(_, rec)| !rec.allocated && rec.size >= req_size)
            .map(|(id, _)| id)
    }

    fn find_allocated(&self, offset: usize) -> Option<SegmentId> {
        self.arena
            .iter()
            .find(|(_, rec)| rec.allocated && rec.offset == offset)
            .map(|(id, _)| id)
    }

    fn checked_record(&self, handle: &AllocHandle) -> Result<&SegmentRecord, PoolError> {
        let id = self
            .find_allocated(handle.offset)
            .ok_or(PoolError::InvalidHandle {
                offset: handle.offset,
            })?;
        let rec = self.arena.get(id);
        if rec.generation != handle.generation {
            return Err(PoolError::InvalidHandle {
                offset: handle.offset,
            });
        }
        Ok(rec)
    }

    /// Walks every invariant the engine relies on. Debug builds run this
    /// after each successful mutation; a breach is a defect and panics.
    #[cfg(debug_assertions)]
    fn validate(&self) {
        let mut expected_offset = 0;
        let mut allocated_bytes = 0;
        let mut allocations = 0;
        let mut gaps = 0;
        let mut prev_was_gap = false;
        for (id, rec) in self.arena.iter() {
            assert_eq!(
                rec.offset, expected_offset,
                "segment list out of step: hole before slot {}",
                id.0
            );
            assert!(rec.size > 0, "zero-size segment in slot {}", id.0);
            expected_offset += rec.size;
            if rec.allocated {
                allocations += 1;
                allocated_bytes += rec.size;
                prev_was_gap = false;
            } else {
                assert!(!prev_was_gap, "uncoalesced gaps around slot {}", id.0);
                assert_eq!(
                    self.gaps.iter().filter(|entry| entry.segment == id).count(),
                    1,
                    "gap index out of step for slot {}",
                    id.0
                );
                gaps += 1;
                prev_was_gap = true;
            }
        }
        assert_eq!(expected_offset, self.total_size, "segment sizes do not sum to the pool size");
        assert_eq!(allocated_bytes, self.allocated_bytes);
        assert_eq!(allocations, self.allocation_count);
        assert_eq!(gaps, self.free_segment_count);
        assert_eq!(self.gaps.len(), gaps);
        assert_eq!(self.arena.live_count(), allocations + gaps);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("total_size", &self.total_size)
            .field("allocated_bytes", &self.allocated_bytes)
            .field("allocation_count", &self.allocation_count)
            .field("free_segment_count", &self.free_segment_count)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_sizes(pool: &Pool) -> Vec<usize> {
        pool.inspect()
            .iter()
            .filter(|seg| !seg.allocated)
            .map(|seg| seg.size)
            .collect()
    }

    /// Carves a pool into free gaps of [10, 30, 20] separated by live
    /// one-byte allocations.
    fn carve_gaps(policy: PlacementPolicy) -> Pool {
        let mut pool = Pool::open(62, policy).unwrap();
        let a = pool.allocate(10).unwrap();
        let _sep1 = pool.allocate(1).unwrap();
        let c = pool.allocate(30).unwrap();
        let _sep2 = pool.allocate(1).unwrap();
        let e = pool.allocate(20).unwrap();
        pool.release(a).unwrap();
        pool.release(c).unwrap();
        pool.release(e).unwrap();
        assert_eq!(free_sizes(&pool), vec![10, 30, 20]);
        pool
    }

    #[test]
    fn test_open_seeds_single_spanning_gap() {
        let pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        assert_eq!(
            pool.inspect(),
            vec![SegmentView {
                size: 100,
                allocated: false
            }]
        );
        assert!(pool.is_pristine());
        assert_eq!(pool.allocated_bytes(), 0);
        assert_eq!(pool.free_segment_count(), 1);
    }

    #[test]
    fn test_open_rejects_zero_size() {
        assert_eq!(
            Pool::open(0, PlacementPolicy::FirstFit).unwrap_err(),
            PoolError::AllocationFailed { requested: 0 }
        );
    }

    #[test]
    fn test_exact_fit_consumes_gap_in_place() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(100).unwrap();
        assert_eq!(
            pool.inspect(),
            vec![SegmentView {
                size: 100,
                allocated: true
            }]
        );
        assert_eq!(pool.free_segment_count(), 0);
        assert_eq!(pool.allocated_bytes(), 100);

        // an exhausted pool refuses further requests without mutating
        assert_eq!(
            pool.allocate(1).unwrap_err(),
            PoolError::NoFitFound { requested: 1 }
        );
        pool.release(handle).unwrap();
        assert!(pool.is_pristine());
    }

    #[test]
    fn test_split_leaves_remainder_gap() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(40).unwrap();
        assert_eq!(handle.offset(), 0);
        assert_eq!(handle.size(), 40);
        assert_eq!(
            pool.inspect(),
            vec![
                SegmentView {
                    size: 40,
                    allocated: true
                },
                SegmentView {
                    size: 60,
                    allocated: false
                },
            ]
        );
    }

    #[test]
    fn test_round_trip_restores_pristine_state() {
        let mut pool = Pool::open(100, PlacementPolicy::BestFit).unwrap();
        let handle = pool.allocate(37).unwrap();
        pool.release(handle).unwrap();
        assert_eq!(
            pool.inspect(),
            vec![SegmentView {
                size: 100,
                allocated: false
            }]
        );
        assert!(pool.is_pristine());
        assert_eq!(pool.allocation_count(), 0);
    }

    #[test]
    fn test_first_fit_takes_first_sufficient_gap() {
        let mut pool = carve_gaps(PlacementPolicy::FirstFit);
        pool.allocate(15).unwrap();
        assert_eq!(free_sizes(&pool), vec![10, 15, 20]);
    }

    #[test]
    fn test_best_fit_takes_tightest_gap() {
        let mut pool = carve_gaps(PlacementPolicy::BestFit);
        pool.allocate(15).unwrap();
        assert_eq!(free_sizes(&pool), vec![10, 30, 5]);
    }

    #[test]
    fn test_best_fit_tie_takes_lowest_offset() {
        // two 20-byte gaps at offsets 0 and 21
        let mut pool = Pool::open(41, PlacementPolicy::BestFit).unwrap();
        let a = pool.allocate(20).unwrap();
        let _sep = pool.allocate(1).unwrap();
        let c = pool.allocate(20).unwrap();
        pool.release(a).unwrap();
        pool.release(c).unwrap();

        let placed = pool.allocate(5).unwrap();
        assert_eq!(placed.offset(), 0);
    }

    #[test]
    fn test_exhaustion_mutates_nothing() {
        let mut pool = Pool::open(50, PlacementPolicy::FirstFit).unwrap();
        let before = pool.inspect();
        assert_eq!(
            pool.allocate(60).unwrap_err(),
            PoolError::NoFitFound { requested: 60 }
        );
        assert_eq!(pool.inspect(), before);
        assert_eq!(pool.allocation_count(), 0);
    }

    #[test]
    fn test_close_guard_keeps_pool_usable() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(10).unwrap();

        let (mut pool, err) = pool.close().unwrap_err();
        assert_eq!(err, PoolError::PoolNotEmpty { live: 1 });

        pool.release(handle).unwrap();
        assert!(pool.close().is_ok());
    }

    #[test]
    fn test_release_with_unknown_offset_fails() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(10).unwrap();
        let mut other = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let foreign = other.allocate(50).unwrap();
        // same pool, offset that is allocated but not a span start
        assert!(matches!(
            pool.release(AllocHandle {
                offset: 5,
                size: 1,
                generation: 1
            }),
            Err(PoolError::InvalidHandle { offset: 5 })
        ));
        // handle minted by another pool at a free offset here
        pool.release(handle).unwrap();
        assert!(matches!(
            pool.release(foreign),
            Err(PoolError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_double_release_fails() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(10).unwrap();
        pool.release(handle).unwrap();
        assert!(matches!(
            pool.release(handle),
            Err(PoolError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_stale_handle_rejected_after_offset_reuse() {
        let mut pool = Pool::open(100, PlacementPolicy::FirstFit).unwrap();
        let first = pool.allocate(10).unwrap();
        pool.release(first).unwrap();

        // same offset, new generation
        let second = pool.allocate(10).unwrap();
        assert_eq!(second.offset(), first.offset());
        assert!(matches!(
            pool.release(first),
            Err(PoolError::InvalidHandle { .. })
        ));
        pool.release(second).unwrap();
        assert!(pool.is_pristine());
    }

    #[test]
    fn test_release_merges_both_neighbors() {
        let mut pool = Pool::open(30, PlacementPolicy::FirstFit).unwrap();
        let a = pool.allocate(10).unwrap();
        let b = pool.allocate(10).unwrap();
        let c = pool.allocate(10).unwrap();

        pool.release(a).unwrap();
        pool.release(c).unwrap();
        assert_eq!(pool.free_segment_count(), 2);

        // middle release folds all three spans into one gap
        pool.release(b).unwrap();
        assert_eq!(
            pool.inspect(),
            vec![SegmentView {
                size: 30,
                allocated: false
            }]
        );
        assert!(pool.is_pristine());
    }

    #[test]
    fn test_bytes_round_trip_and_staleness() {
        let mut pool = Pool::open(64, PlacementPolicy::FirstFit).unwrap();
        let handle = pool.allocate(4).unwrap();
        pool.bytes_mut(&handle).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(pool.bytes(&handle).unwrap(), &[1, 2, 3, 4]);

        pool.release(handle).unwrap();
        assert!(matches!(
            pool.bytes(&handle),
            Err(PoolError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_handles_survive_arena_growth() {
        let mut pool = Pool::open(4096, PlacementPolicy::FirstFit).unwrap();
        // 64 splits push the arena well past its initial slot capacity
        let handles: Vec<AllocHandle> = (0..64).map(|_| pool.allocate(32).unwrap()).collect();
        assert_eq!(pool.allocation_count(), 64);

        for handle in handles.into_iter().rev() {
            pool.release(handle).unwrap();
        }
        assert!(pool.is_pristine());
    }

    #[test]
    fn test_stats_report_largest_gap_and_fragmentation() {
        let pool = carve_gaps(PlacementPolicy::FirstFit);
        let stats = pool.stats();
        assert_eq!(stats.largest_gap, 30);
        assert_eq!(stats.free_bytes(), 60);
        assert_eq!(stats.allocation_count, 2);
        assert!(stats.fragmentation() > 0.0);

        // a pristine pool is one unfragmented gap
        let fresh = Pool::open(128, PlacementPolicy::FirstFit).unwrap();
        assert_eq!(fresh.stats().fragmentation(), 0.0);
    }
}
