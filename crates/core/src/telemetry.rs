use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` when set, otherwise `info`.
pub fn init() {
    init_with_fallback("info");
}

/// Initialise with an explicit fallback filter.
///
/// Idempotent: a second call (e.g. from another test) is a no-op.
pub fn init_with_fallback(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
