//! Error types for placement, release and pool lifecycle guards.

use thiserror::Error;

/// Recoverable failures surfaced by the allocator engine.
///
/// Internal consistency breaches (the gap index and the segment list
/// disagreeing) are defects, not errors: those panic instead of appearing
/// here, since continuing would risk double-counting or corrupted spans.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The backing buffer or an internal table could not be reserved.
    #[error("reservation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    /// No free segment can hold the requested span.
    #[error("no gap fits a request of {requested} bytes")]
    NoFitFound { requested: usize },

    /// Close was refused because the pool still holds live allocations.
    #[error("pool still holds {live} live allocation(s)")]
    PoolNotEmpty { live: usize },

    /// The handle matches no live allocation: unknown offset, or a stale
    /// generation left over from a released segment.
    #[error("no live allocation matches the handle at offset {offset}")]
    InvalidHandle { offset: usize },
}
