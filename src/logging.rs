//! Logging bootstrap
//!
//! Logs go to stderr so that they never interleave with the reporter's
//! stdout. The first initialization in a process wins.

use tracing_subscriber::EnvFilter;

/// Filter used when the configured one does not parse
pub const FALLBACK_FILTER: &str = "warn";

/// Install the fmt subscriber with `filter` (`EnvFilter` syntax).
///
/// Returns whether this call installed it.
pub fn init(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
