//! Shared setup for the integration suites.

#![allow(dead_code)]

/// Routes `log` output from the library and the tests to stderr.
pub fn init_test_logging() {
    stopsync::test_utils::init_test_logging();
}

/// Proptest configuration trimmed for suites that block on real threads.
pub fn test_proptest_config() -> proptest::test_runner::Config {
    proptest::test_runner::Config {
        cases: 64,
        ..proptest::test_runner::Config::default()
    }
}
