//! ## minnespool-telemetry::logging
//! **Structured logging built on `tracing`**
//!
//! ### Expectations:
//! - One-line init from the composition root
//! - `RUST_LOG` always wins over the configured fallback filter
//! - Pool lifecycle events carried as structured fields, not format noise

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber with an `info` fallback filter.
    pub fn init() {
        Self::init_with_filter("info");
    }

    /// Installs the global fmt subscriber; `default_filter` applies only
    /// when `RUST_LOG` is unset.
    pub fn init_with_filter(default_filter: &str) {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_filter)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .init()
    }

    #[inline]
    pub fn log_event(event_type: &str, message: &str) {
        let span = info_span!("pool_event", event_type = event_type);
        let _guard = span.enter();
        tracing::info!("{message}");
    }
}
