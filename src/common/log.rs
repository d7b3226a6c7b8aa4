//! Logging utilities

/// Initialize the logging system
///
/// # Parameters
///
/// * `level` - Default log level, overridable via `RUST_LOG`
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env).try_init();
}
