//! Error types for the registry's directory and lifecycle operations.

use thiserror::Error;

use minnespool_core::PoolError;

use crate::PoolId;

/// Failures surfaced by [`crate::PoolRegistry`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The id was never issued by this registry.
    #[error("pool {0} was never opened here")]
    UnknownPool(PoolId),

    /// The id was valid once, but its pool has been closed. Ids are not
    /// reused, so this always points at a caller lifecycle bug.
    #[error("pool {0} is already closed")]
    AlreadyClosed(PoolId),

    /// Shutdown was refused while pools remain open.
    #[error("{open} pool(s) still open")]
    PoolsStillOpen { open: usize },

    /// An engine-level failure, bubbled up unchanged.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
