//! Logging configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Telemetry knobs for the CLI composition root.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetrySettings {
    /// Fallback tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    #[validate(custom(function = validation::validate_log_filter))]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}
