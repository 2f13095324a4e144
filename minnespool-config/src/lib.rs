//! # Minnespool Configuration System
//!
//! Hierarchical configuration management for minnespool pools and the
//! workload driver.
//!
//! ## Features
//! - **Unified Configuration**: Single source of truth across all components
//! - **Validation**: Runtime validation of every loaded parameter
//! - **Environment Awareness**: `MINNESPOOL_*` variables override files

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod pool;
mod telemetry;
mod validation;
mod workload;

pub use error::ConfigError;
pub use pool::PoolSettings;
pub use telemetry::TelemetrySettings;
pub use workload::WorkloadSettings;

/// Top-level configuration container for all minnespool components.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
#[validate(schema(function = validation::validate_workload_fits_pool))]
pub struct MinnespoolConfig {
    /// Pool sizing and placement.
    #[validate(nested)]
    pub pool: PoolSettings,

    /// Workload shaping for the CLI driver.
    #[validate(nested)]
    pub workload: WorkloadSettings,

    /// Logging configuration.
    #[validate(nested)]
    pub telemetry: TelemetrySettings,
}

impl MinnespoolConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/minnespool.yaml` - base settings. If missing, defaults are used.
    /// 3. `MINNESPOOL_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Start with defaults.
        let mut figment = Figment::from(Serialized::defaults(MinnespoolConfig::default()));

        if Path::new("config/minnespool.yaml").exists() {
            figment = figment.merge(Yaml::file("config/minnespool.yaml"));
        }

        figment
            .merge(Env::prefixed("MINNESPOOL_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(MinnespoolConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MINNESPOOL_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
