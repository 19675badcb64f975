//! `tracing` subscriber setup for binaries and tests embedding the planner.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a stderr formatter filtered by `RUST_LOG` (default `info`).
///
/// Panics if a global subscriber is already set; use
/// [`init_test_logging`] where that can happen.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .init();
}

/// Like [`init_logging`], but quietly does nothing when called again.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(env_filter())
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
