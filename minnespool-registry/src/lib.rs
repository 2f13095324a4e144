//! # minnespool-registry
//!
//! Directory of open pools, keyed by opaque [`PoolId`] handles. The
//! registry is an explicit object owned by the application's composition
//! root — there is no process-wide state, so two registries can coexist
//! and tests never fight over globals.
//!
//! The slot table only ever grows: a closed pool leaves its slot vacant
//! for the registry's lifetime, which keeps stale ids deterministically
//! detectable instead of silently resolving to a newer pool.

use std::fmt;

use tracing::debug;

use minnespool_core::{PlacementPolicy, Pool, PoolError};

mod error;

pub use error::RegistryError;

const REGISTRY_INIT_CAPACITY: usize = 20;
const REGISTRY_FILL_FACTOR: f64 = 0.75;
const REGISTRY_EXPAND_FACTOR: usize = 2;

/// Identifier of one pool within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(u32);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every pool opened through it, strictly hierarchically: registry
/// over pools, pools over their buffers and bookkeeping.
pub struct PoolRegistry {
    slots: Vec<Option<Pool>>,
    open_count: usize,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::with_capacity(REGISTRY_INIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            open_count: 0,
        }
    }

    /// Pools currently open (vacated slots excluded).
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Opens a pool and registers it under a fresh id.
    pub fn open_pool(
        &mut self,
        size: usize,
        policy: PlacementPolicy,
    ) -> Result<PoolId, RegistryError> {
        self.ensure_slot_available()?;
        let pool = Pool::open(size, policy)?;
        let id = PoolId(self.slots.len() as u32);
        self.slots.push(Some(pool));
        self.open_count += 1;
        debug!(%id, size, policy = %policy, "pool registered");
        Ok(id)
    }

    pub fn pool(&self, id: PoolId) -> Result<&Pool, RegistryError> {
        match self.slots.get(id.0 as usize) {
            Some(Some(pool)) => Ok(pool),
            Some(None) => Err(RegistryError::AlreadyClosed(id)),
            None => Err(RegistryError::UnknownPool(id)),
        }
    }

    pub fn pool_mut(&mut self, id: PoolId) -> Result<&mut Pool, RegistryError> {
        match self.slots.get_mut(id.0 as usize) {
            Some(Some(pool)) => Ok(pool),
            Some(None) => Err(RegistryError::AlreadyClosed(id)),
            None => Err(RegistryError::UnknownPool(id)),
        }
    }

    /// Closes one pool. The non-empty guard lives in the engine; on
    /// refusal the pool stays registered and fully usable.
    pub fn close_pool(&mut self, id: PoolId) -> Result<(), RegistryError> {
        let slot = match self.slots.get_mut(id.0 as usize) {
            Some(slot) => slot,
            None => return Err(RegistryError::UnknownPool(id)),
        };
        let pool = slot.take().ok_or(RegistryError::AlreadyClosed(id))?;
        match pool.close() {
            Ok(()) => {
                self.open_count -= 1;
                debug!(%id, "pool deregistered");
                Ok(())
            }
            Err((pool, err)) => {
                *slot = Some(pool);
                Err(err.into())
            }
        }
    }

    /// Tears the registry down. Refused while any pool is still open, in
    /// which case the registry is handed back intact.
    pub fn shutdown(self) -> Result<(), (Self, RegistryError)> {
        if self.open_count == 0 {
            Ok(())
        } else {
            let open = self.open_count;
            Err((self, RegistryError::PoolsStillOpen { open }))
        }
    }

    /// Grows the slot table past the fill factor. The table never
    /// shrinks and vacated slots are never refilled.
    fn ensure_slot_available(&mut self) -> Result<(), RegistryError> {
        let capacity = self.slots.capacity().max(REGISTRY_INIT_CAPACITY);
        if (self.slots.len() + 1) as f64 > capacity as f64 * REGISTRY_FILL_FACTOR {
            let target = capacity * REGISTRY_EXPAND_FACTOR;
            self.slots
                .try_reserve(target - self.slots.len())
                .map_err(|_| PoolError::AllocationFailed { requested: target })?;
        }
        Ok(())
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
