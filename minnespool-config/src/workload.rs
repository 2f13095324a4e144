//! Workload shaping for the CLI driver.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Parameters of one randomized allocate/release run.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validation::validate_request_bounds))]
pub struct WorkloadSettings {
    /// Number of allocate/release decisions per run.
    #[serde(default = "default_operations")]
    #[validate(range(min = 1, max = 10_000_000))]
    pub operations: usize,

    /// Seed for the deterministic request stream.
    #[serde(default)]
    pub seed: u64,

    /// Smallest request size in bytes.
    #[serde(default = "default_min_request")]
    #[validate(range(min = 1))]
    pub min_request: usize,

    /// Largest request size in bytes.
    #[serde(default = "default_max_request")]
    #[validate(range(min = 1))]
    pub max_request: usize,

    /// Probability that a step releases a live span instead of placing a
    /// new one.
    #[serde(default = "default_release_probability")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub release_probability: f64,
}

fn default_operations() -> usize {
    10_000
}

fn default_min_request() -> usize {
    16
}

fn default_max_request() -> usize {
    4096
}

fn default_release_probability() -> f64 {
    0.4
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            operations: default_operations(),
            seed: 0,
            min_request: default_min_request(),
            max_request: default_max_request(),
            release_probability: default_release_probability(),
        }
    }
}
