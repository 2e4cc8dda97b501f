//! Logging bootstrap.
//!
//! The library only emits `tracing` events; hosts decide where they go. These
//! helpers install the plain `fmt` subscriber for hosts without their own.

/// Installs a `tracing_subscriber::fmt` subscriber. Later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt().try_init();
}

/// Like [`init`], but writes through the test harness so output is captured per test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
