//! Tracing Setup
//!
//! Installs a `tracing-subscriber` formatter for test binaries. `RUST_LOG`
//! wins over the fallback directive, e.g.
//! `RUST_LOG=anchorage=debug cargo test` shows every recovery attempt.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the subscriber with [`DEFAULT_DIRECTIVE`] as fallback
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_DIRECTIVE)
}

/// Install the subscriber with `fallback` as the filter when `RUST_LOG` is unset
pub fn init_tracing_with(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}
