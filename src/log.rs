//! Logging bootstrap. Modules emit messages through the five `log` facade
//! macros (`error!` .. `trace!`); this module owns the `env_logger` setup.
//!
//! Logging is disabled by default. The CLI maps `-v`/`-vv`/`-vvv` onto a
//! [`LevelFilter`] and calls [`init`]; tests may call [`init`] repeatedly,
//! later calls are ignored once a global logger is installed.

use std::collections::HashMap;

use env_logger::Builder;
pub use log::{debug, error, info, trace, warn, LevelFilter};

// Logging disabled unless asked for.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// Installs the global logger with the given global level filter.
pub fn init(level: LevelFilter) {
    init_with_module_filters(level, &HashMap::new());
}

/// Installs the global logger with a global level filter plus per-module
/// ("target") overrides.
pub fn init_with_module_filters(level: LevelFilter, module_filters: &HashMap<&str, LevelFilter>) {
    let mut builder = Builder::new();
    builder.filter_level(level).format_timestamp(None);
    for (&module, &filter) in module_filters {
        builder.filter(Some(module), filter);
    }
    // A second init (e.g. from another test) is a no-op.
    let _ = builder.try_init();
}

/// Maps the CLI verbosity count onto a level filter.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => DEFAULT_LOG_LEVEL,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Off);
        assert_eq!(level_for_verbosity(1), LevelFilter::Info);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(3), LevelFilter::Trace);
        assert_eq!(level_for_verbosity(200), LevelFilter::Trace);
    }

    #[test]
    fn double_init_is_harmless() {
        init(LevelFilter::Off);
        init(LevelFilter::Warn);
    }
}
