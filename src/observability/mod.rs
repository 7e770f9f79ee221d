//! Logging setup
//!
//! All modules log through `tracing` macros with structured fields
//! (`key`, `locator`, `error`). The binary installs one subscriber that
//! writes human-readable lines to stderr; `RUST_LOG` overrides the
//! configured filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor configuration sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Build the filter: `RUST_LOG` when set and valid, else `fallback`,
/// else [`DEFAULT_LOG_FILTER`].
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(fallback: &str) {
    let result = tracing_subscriber::registry()
        .with(env_filter(fallback))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
