//! Logging setup for the `project` binary.

use log::LevelFilter;

/// Installs the global logger.
///
/// `verbose` lowers this crate's filter to debug output while dependencies
/// stay at warnings. `RUST_LOG` overrides both.
pub fn init_logger(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let installed = env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("project_tools", level)
        .format_timestamp(None)
        .format_target(verbose)
        .parse_default_env()
        .try_init();
    if installed.is_err() {
        log::debug!("logger already installed");
    }
}
