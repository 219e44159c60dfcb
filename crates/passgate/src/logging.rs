//! Log output setup for hosts that don't install their own subscriber.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug`
/// when `debug` is true. Panics if a global subscriber is already set, so
/// call it once at startup; use [`try_init`] when that isn't guaranteed.
pub fn init(debug: bool) {
    fmt()
        .with_env_filter(filter(debug))
        .with_target(true)
        .init();
}

/// Like [`init`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init(debug: bool) -> bool {
    fmt()
        .with_env_filter(filter(debug))
        .with_target(true)
        .try_init()
        .is_ok()
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}
