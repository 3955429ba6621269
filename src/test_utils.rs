//! Shared logging and assertion helpers for the crate's tests.
//!
//! Tests call [`init_test_logging`] first so that `log` output from the
//! library (and from the tests themselves) lands on stderr with elapsed
//! timestamps, then mark their structure with [`test_phase!`],
//! [`test_section!`] and [`test_complete!`]. [`assert_with_log!`] records the
//! expected/actual pair through the logger before panicking, so a failing
//! concurrent test leaves a readable trace.
//!
//! [`test_phase!`]: crate::test_phase
//! [`test_section!`]: crate::test_section
//! [`test_complete!`]: crate::test_complete
//! [`assert_with_log!`]: crate::assert_with_log

use std::sync::Once;
use std::time::Instant;

use log::{LevelFilter, Metadata, Record};

struct StderrLogger {
    start: Instant,
}

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        eprintln!(
            "[{elapsed_ms:>10.3}ms] [{:>5}] {} | {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Installs the stderr test logger once per process.
///
/// The maximum level comes from the `TEST_LOG_LEVEL` environment variable
/// (`error`..`trace`), defaulting to `debug`. Safe to call from every test;
/// only the first call has any effect.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = std::env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|value| value.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Debug);
        let logger = Box::leak(Box::new(StderrLogger {
            start: Instant::now(),
        }));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(level);
        }
    });
}

/// Marks the start of a test (or a named phase of one) in the log.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        ::log::info!(target: "test", "=== phase: {} ===", $name)
    };
}

/// Marks a step within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        ::log::info!(target: "test", "--- {} ---", $name)
    };
}

/// Marks the successful end of a test, optionally recording result values.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        ::log::info!(target: "test", "=== complete: {} ===", $name)
    };
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        ::log::info!(
            target: "test",
            "=== complete: {} ({}) ===",
            $name,
            [$(format!("{}={:?}", stringify!($key), $value)),+].join(" ")
        )
    };
}

/// Asserts `cond`, logging the expected/actual pair before panicking.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $label:expr, $expected:expr, $actual:expr) => {
        if !$cond {
            ::log::error!(
                target: "test",
                "FAILED: {} (expected {:?}, got {:?})",
                $label,
                $expected,
                $actual
            );
        }
        assert!($cond, "{}: expected {:?}, got {:?}", $label, $expected, $actual);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        log::debug!(target: "test", "logger initialized twice without panic");
    }

    #[test]
    fn macros_expand() {
        init_test_logging();
        crate::test_phase!("macros_expand");
        crate::test_section!("expansion");
        crate::assert_with_log!(1 + 1 == 2, "arithmetic holds", 2, 1 + 1);
        crate::test_complete!("macros_expand", checked = true);
    }
}
