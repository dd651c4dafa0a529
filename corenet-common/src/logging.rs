//! Global logging setup.
//!
//! Library crates never install a subscriber themselves; they only emit
//! `tracing` events and spans. Binaries call [`init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber reading its filter from `RUST_LOG`,
/// defaulting to `info` when unset.
///
/// Calling this more than once per process is a logic error in the caller;
/// the second call is a no-op because `tracing` refuses a second global
/// default, so failures are swallowed rather than panicking a binary that
/// merely re-initializes during tests.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
