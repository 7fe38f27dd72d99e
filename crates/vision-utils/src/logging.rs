//! Logging and tracing utilities

use crate::config::Config;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with default configuration
///
/// The filter is read from `RUST_LOG` and falls back to `info`.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing subscriber, using `default_filter` when `RUST_LOG` is unset
pub fn init_tracing_with_default(default_filter: &str) {
    // try_init so that repeated initialisation (tests, embedded use) is a no-op
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Initialize tracing with JSON-formatted events, for log collectors
pub fn init_json_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

/// Human-readable logs in development, JSON in production
pub fn init_tracing_for(config: &Config) {
    if config.is_production() {
        init_json_tracing("info");
    } else {
        init_tracing();
    }
}
