//! Diagnostics setup for the `grimreel` binary and embedding applications.
//!
//! Events go to stderr; `RUST_LOG` selects what is shown (default `grimreel=info`).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "grimreel=info";

/// Filter from `RUST_LOG`, or the crate default when unset or unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}
