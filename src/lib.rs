//! Process-wide logging for a long-running service.
//!
//! There are two loggers. The default logger receives everything from info and up and is written
//! to `log.txt`, rotated at 5 MiB with two archives kept. The trace logger receives low-priority
//! detail and is written to `poll.txt` without any history. Both live in
//! `<root>/<service name>/<executable name>`, where the root is `%ProgramData%` on Windows and
//! `/var/log` elsewhere. Debug builds write both to STDERR instead, with the trace logger being
//! an alias for the default logger. Records at warning and up are flushed immediately, everything
//! else is flushed in the background every three seconds.
//!
//! ```no_run
//! use svc_log::{log_info, log_trace, ExecutableName, LogConfig};
//!
//! svc_log::configure(LogConfig::from_environment(ExecutableName::new("gateway").unwrap()))
//!     .expect("Logging was already configured");
//!
//! log_info!("Listening on port {}", 8080);
//! log_trace!("Poll returned {} events", 3);
//! ```

mod builder;
mod config;
mod dir;
mod flusher;
mod logger;
mod registry;
mod severity;
mod target;

pub use builder::{BuildError, LoggerBuilder, SinkKind};
pub use config::{
    ExecutableName, InvalidExecutableName, LogConfig, SinkChoice, FLUSH_INTERVAL,
    GIT_COMMIT_HASH, MAX_FILE_SIZE, SERVICE_NAME, SVC_LOG_DIR_ENV, SVC_LOG_ENV, VERSION,
};
#[cfg(windows)]
pub use dir::ProgramDataRoot;
pub use dir::{log_directory as resolve_log_directory, platform_root, FixedRoot, LogRoot, PosixRoot};
pub use flusher::flush_all;
pub use logger::{Location, Logger};
pub use registry::{
    configure, default_logger, global_config, log_directory, trace_logger, InitError,
    LoggingContext, DEFAULT_LOG_FILE, TRACE_LOG_FILE,
};
pub use severity::Severity;
pub use target::RotationPolicy;

/// Used by the macros. Not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::registry::{log_to_channel, Channel};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __svc_log {
    ($channel:ident, $severity:ident, logger: $logger:expr, $($arg:tt)+) => {
        $logger.log(
            $crate::Severity::$severity,
            $crate::Location::new(file!(), line!()),
            format_args!($($arg)+),
        )
    };
    ($channel:ident, $severity:ident, $($arg:tt)+) => {
        $crate::__private::log_to_channel(
            $crate::__private::Channel::$channel,
            $crate::Severity::$severity,
            $crate::Location::new(file!(), line!()),
            format_args!($($arg)+),
        )
    };
}

/// Log a trace record to the trace logger, or to `logger: <expr>` if one is given.
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)+) => { $crate::__svc_log!(Trace, Trace, $($arg)+) };
}

/// Log a debug record to the default logger, or to `logger: <expr>` if one is given.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => { $crate::__svc_log!(Default, Debug, $($arg)+) };
}

/// Log an info record to the default logger, or to `logger: <expr>` if one is given.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { $crate::__svc_log!(Default, Info, $($arg)+) };
}

/// Log a warning to the default logger, or to `logger: <expr>` if one is given. Flushed before
/// the macro returns.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => { $crate::__svc_log!(Default, Warn, $($arg)+) };
}

/// Log an error to the default logger, or to `logger: <expr>` if one is given. Flushed before
/// the macro returns.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { $crate::__svc_log!(Default, Error, $($arg)+) };
}

/// Log a critical error to the default logger, or to `logger: <expr>` if one is given. Flushed
/// before the macro returns.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => { $crate::__svc_log!(Default, Critical, $($arg)+) };
}
