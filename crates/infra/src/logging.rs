//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG` wins over the
//! configured default filter.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber with `default_filter` as fallback.
///
/// Returns `false` when a subscriber was already installed; calling it
/// again is harmless.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(idswitch_domain::constants::DEFAULT_LOG_FILTER));

    fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

/// Like [`init`], writing to the test harness's captured output.
pub fn init_for_tests() -> bool {
    fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init()
        .is_ok()
}
