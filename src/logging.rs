//! Logger setup.
//!
//! Natively logs go to stderr through `env_logger`, where `RUST_LOG`
//! overrides the configured level. In the browser they go to the console.

use crate::config::LogLevel;

/// Install the platform logger at `level`.
///
/// Returns false if a logger was already installed; the existing one is kept.
pub fn init(level: LogLevel) -> bool {
    let filter = level.to_level_filter();

    #[cfg(not(target_arch = "wasm32"))]
    let installed = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init()
        .is_ok();

    #[cfg(target_arch = "wasm32")]
    let installed = {
        console_error_panic_hook::set_once();
        filter
            .to_level()
            .is_some_and(|level| console_log::init_with_level(level).is_ok())
    };

    if installed {
        log::debug!("Logging initialized at {:?}", filter);
    }
    installed
}
