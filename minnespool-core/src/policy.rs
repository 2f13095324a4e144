//! Placement policies for selecting which gap satisfies a request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a pool picks the free segment that backs an allocation.
///
/// Fixed at pool creation and immutable afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// First sufficient gap in buffer-address order.
    #[default]
    FirstFit,
    /// Tightest sufficient gap; equal sizes resolve to the lowest address.
    BestFit,
}

impl fmt::Display for PlacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementPolicy::FirstFit => f.write_str("first_fit"),
            PlacementPolicy::BestFit => f.write_str("best_fit"),
        }
    }
}

impl FromStr for PlacementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_fit" | "first-fit" => Ok(PlacementPolicy::FirstFit),
            "best_fit" | "best-fit" => Ok(PlacementPolicy::BestFit),
            other => Err(format!("unknown placement policy '{other}'")),
        }
    }
}
