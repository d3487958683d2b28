//! Lives in its own test binary since the failed construction is cached for the whole process.

use std::fs;
use svc_log::{log_error, log_trace, ExecutableName, InitError, LogConfig, SinkChoice};

#[test]
fn failed_construction_is_not_retried() {
    let scratch = tempfile::tempdir().unwrap();
    // A regular file can't have children, so the log directory can't be created under it
    let blocker = scratch.path().join("blocker");
    fs::write(&blocker, b"").unwrap();

    svc_log::configure(
        LogConfig::new(ExecutableName::new("init-failure-test").unwrap())
            .with_sink(SinkChoice::RotatingFile)
            .with_root(&blocker),
    )
    .unwrap();

    let first = svc_log::default_logger().unwrap_err();
    assert!(matches!(*first, InitError::CreateDirectory { .. }));
    assert!(svc_log::trace_logger().is_err());

    // Even once the directory could be created, the first outcome sticks
    fs::remove_file(&blocker).unwrap();
    let second = svc_log::default_logger().unwrap_err();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(svc_log::trace_logger().is_err());

    // The macros drop their records instead of panicking or creating anything
    log_error!("nowhere to go");
    log_trace!("nowhere to go either");
    assert!(!blocker.exists());
}
