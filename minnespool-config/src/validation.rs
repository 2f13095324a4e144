//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration
//! modules.

use validator::ValidationError;

use crate::workload::WorkloadSettings;
use crate::MinnespoolConfig;

/// Validate that the workload request bounds are ordered.
pub fn validate_request_bounds(workload: &WorkloadSettings) -> Result<(), ValidationError> {
    if workload.min_request > workload.max_request {
        return Err(ValidationError::new("min_request_above_max_request"));
    }
    Ok(())
}

/// Validate that the largest workload request can ever be placed.
pub fn validate_workload_fits_pool(config: &MinnespoolConfig) -> Result<(), ValidationError> {
    if config.workload.max_request > config.pool.size_bytes {
        return Err(ValidationError::new("max_request_exceeds_pool_size"));
    }
    Ok(())
}

/// Validate a plain tracing level name.
pub fn validate_log_filter(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
