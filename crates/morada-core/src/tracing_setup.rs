use tracing_subscriber::EnvFilter;

/// Initialize logging for binaries and tests embedding this crate.
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call more than once
/// (subsequent calls are no-ops).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
