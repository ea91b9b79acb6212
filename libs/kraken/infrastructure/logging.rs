//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing with standard configuration.
///
/// Level defaults to `info`; override with `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}
