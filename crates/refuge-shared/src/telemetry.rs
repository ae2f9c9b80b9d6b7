//! Tracing bootstrap shared by binaries, examples, and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Honours `RUST_LOG`; defaults to debug for the refuge crates and warn for
/// everything else. Safe to call more than once: subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("refuge_chat=debug,refuge_backend=debug,refuge_rescue=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
