// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging for the sfrun workspace.
//!
//! Output goes to stderr through `emit_term`, so result tables on stdout stay
//! clean. The level comes from `SFRUN_LOG`:
//! - `off` (default): no logs
//! - `error`, `warn`, `info`, `debug`
//!
//! An unrecognized value falls back to `info`.

use std::sync::Once;

// Re-export emit so the macros below resolve from any crate
pub use emit;

/// Environment variable selecting the log level
pub const LOG_ENV: &str = "SFRUN_LOG";

static INIT: Once = Once::new();

/// Parsed form of the `SFRUN_LOG` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSetting {
    Off,
    Level(emit::Level),
    /// Value not understood; treated as `info`
    Unknown,
}

/// Interpret a `SFRUN_LOG` value.
#[must_use]
pub fn parse_log_setting(value: &str) -> LogSetting {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => LogSetting::Off,
        "debug" => LogSetting::Level(emit::Level::Debug),
        "info" => LogSetting::Level(emit::Level::Info),
        "warn" => LogSetting::Level(emit::Level::Warn),
        "error" => LogSetting::Level(emit::Level::Error),
        _ => LogSetting::Unknown,
    }
}

/// Initialize diagnostics from the `SFRUN_LOG` environment variable.
///
/// Call once at startup. Later calls are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let raw = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let level = match parse_log_setting(&raw) {
            LogSetting::Off => return,
            LogSetting::Level(level) => level,
            LogSetting::Unknown => {
                // Logging isn't up yet, so this one goes straight to stderr
                #[allow(clippy::print_stderr)]
                {
                    eprintln!("Warning: Unknown {LOG_ENV} value '{raw}', using 'info'");
                }
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime must outlive every emitter; the process owns it from here
        std::mem::forget(rt);
    });
}

/// Log normal operations (connect, close, script summary)
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed steps (each statement, chunk downloads, polling)
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems (placeholder credentials, close failures)
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that end the run
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_parse_log_setting() {
        assert_eq!(parse_log_setting("off"), LogSetting::Off);
        assert_eq!(parse_log_setting(""), LogSetting::Off);
        assert_eq!(parse_log_setting("DEBUG"), LogSetting::Level(emit::Level::Debug));
        assert_eq!(parse_log_setting(" warn "), LogSetting::Level(emit::Level::Warn));
        assert_eq!(parse_log_setting("error"), LogSetting::Level(emit::Level::Error));
        assert_eq!(parse_log_setting("verbose"), LogSetting::Unknown);
    }

    #[test]
    fn test_macros_compile() {
        let count = 3;
        info!("Executed {count} statements", count: count);
        debug!("Debug message with {value}", value: 42);
        warn!("Warning message");
        error!("Error message");
    }
}
