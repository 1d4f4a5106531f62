//! Structured logging configuration.
//!
//! Initializes a `tracing` subscriber with an environment-aware filter. The
//! configured level is the default; `RUST_LOG` overrides it when set.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber from a logging config.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Initialize logging with defaults. Intended for tests and examples.
pub fn init_default() {
    init(&LoggingConfig::default());
}
