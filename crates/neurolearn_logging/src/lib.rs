#![deny(missing_docs)]
//! Logging shared by the neurolearn crates.
//!
//! The `learn_*` macros forward to the `log` facade through a re-export, so
//! callers do not need their own `log` dependency. Which backend receives the
//! records is decided once, by the binary or by [`initialize_for_tests`].

use log::LevelFilter;

#[doc(hidden)]
pub use log as __log;

/// Environment variable that overrides the test log level (`off`, `error`,
/// `warn`, `info`, `debug`, `trace`).
pub const TEST_LEVEL_VAR: &str = "NEUROLEARN_TEST_LOG";

/// Logs at trace level.
#[macro_export]
macro_rules! learn_trace {
    ($($arg:tt)*) => { $crate::__log::trace!($($arg)*) };
}

/// Logs at debug level.
#[macro_export]
macro_rules! learn_debug {
    ($($arg:tt)*) => { $crate::__log::debug!($($arg)*) };
}

/// Logs at info level.
#[macro_export]
macro_rules! learn_info {
    ($($arg:tt)*) => { $crate::__log::info!($($arg)*) };
}

/// Logs at warn level.
#[macro_export]
macro_rules! learn_warn {
    ($($arg:tt)*) => { $crate::__log::warn!($($arg)*) };
}

/// Logs at error level.
#[macro_export]
macro_rules! learn_error {
    ($($arg:tt)*) => { $crate::__log::error!($($arg)*) };
}

/// Resolves the test log level from an optional override.
///
/// Unparseable overrides are ignored. Without one, debug builds log at debug
/// and release builds at info.
pub fn test_level(requested: Option<&str>) -> LevelFilter {
    requested
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
}

/// Installs a terminal logger for tests, honouring [`TEST_LEVEL_VAR`].
///
/// Safe to call from every test: only the first call in a process installs
/// anything.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let requested = std::env::var(TEST_LEVEL_VAR).ok();
    let _ = TermLogger::init(
        test_level(requested.as_deref()),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_when_it_parses() {
        assert_eq!(test_level(Some("warn")), LevelFilter::Warn);
        assert_eq!(test_level(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(test_level(Some("off")), LevelFilter::Off);
    }

    #[test]
    fn garbage_falls_back_to_build_default() {
        assert_eq!(test_level(Some("loud")), test_level(None));
        assert!(test_level(None) >= LevelFilter::Info);
    }
}
