//! Tracing subscriber setup for binaries.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `level`, else `RUST_LOG`, else `info`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(level: Option<&str>) -> bool {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
}
