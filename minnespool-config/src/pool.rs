//! Pool sizing and placement configuration.

use minnespool_core::PlacementPolicy;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the pool a workload runs against.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct PoolSettings {
    /// Backing buffer size in bytes.
    #[serde(default = "default_size_bytes")]
    #[validate(range(min = 64, max = 1_073_741_824))]
    pub size_bytes: usize,

    /// Placement policy: `first_fit` or `best_fit`.
    #[serde(default)]
    pub policy: PlacementPolicy,
}

fn default_size_bytes() -> usize {
    1 << 20
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size_bytes: default_size_bytes(),
            policy: PlacementPolicy::default(),
        }
    }
}
