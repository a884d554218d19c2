//! `tracing` subscriber setup for test runs.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `permMatrix=debug`.
pub const LOG_ENV: &str = "PERM_MATRIX_LOG";

/// Install a test-friendly subscriber. Later calls are no-ops.
///
/// The filter comes from `PERM_MATRIX_LOG`, falling back to `warn` so
/// mismatches show up in test output without per-entry noise.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}
