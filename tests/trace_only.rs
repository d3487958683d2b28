//! Lives in its own test binary so the trace logger is the first logger to be constructed.

use std::fs;
use svc_log::{ExecutableName, LogConfig, SinkChoice};

#[test]
fn trace_logger_installs_the_log_bridge() {
    let scratch = tempfile::tempdir().unwrap();
    svc_log::configure(
        LogConfig::new(ExecutableName::new("trace-only-test").unwrap())
            .with_sink(SinkChoice::RotatingFile)
            .with_root(scratch.path()),
    )
    .unwrap();

    svc_log::trace_logger().unwrap();
    log::trace!("detail from a dependency");
    svc_log::flush_all();

    let dir = svc_log::log_directory().unwrap();
    let trace = fs::read_to_string(dir.join("poll.txt")).unwrap();
    assert!(trace.contains("detail from a dependency"));
}
