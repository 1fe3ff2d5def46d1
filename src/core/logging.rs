//! Logging initialization and utilities

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// lodterrain::core::logging::init();
/// log::info!("Terrain streamer started");
/// ```
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Initialize logging with a custom fallback filter (e.g. `"lodterrain=debug"`).
///
/// Panics if a logger is already installed; use [`try_init`] in tests.
pub fn init_with_filter(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .init();
}

/// Initialize logging, ignoring the error when a logger already exists.
///
/// Returns `true` if this call installed the logger.
pub fn try_init() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
        .is_test(cfg!(test))
        .try_init()
        .is_ok()
}
