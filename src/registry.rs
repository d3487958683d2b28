//! The process-wide `default` and `trace` loggers.

use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::builder::{BuildError, LoggerBuilder, SinkKind};
use crate::config::{
    ExecutableName, LogConfig, SinkChoice, GIT_COMMIT_HASH, SERVICE_NAME, VERSION,
};
use crate::dir;
use crate::logger::{Location, Logger};
use crate::severity::Severity;
use crate::target::RotationPolicy;

/// The file the default logger writes to, inside of the log directory.
pub const DEFAULT_LOG_FILE: &str = "log.txt";
/// The file the trace logger writes to, inside of the log directory.
pub const TRACE_LOG_FILE: &str = "poll.txt";

/// The number of files the default logger keeps, including the current one.
const DEFAULT_MAX_FILES: usize = 3;
/// The trace logger doesn't keep any history.
const TRACE_MAX_FILES: usize = 1;

static CONFIG: OnceCell<LogConfig> = OnceCell::new();
/// The outcome of the first construction attempt. Failures are kept as well, so a broken setup
/// doesn't touch the file system again for every record.
static DEFAULT_LOGGER: OnceCell<Result<Arc<Logger>, Arc<InitError>>> = OnceCell::new();
static TRACE_LOGGER: OnceCell<Result<Arc<Logger>, Arc<InitError>>> = OnceCell::new();

/// Set after the first initialization failure has been printed, so a broken setup doesn't print
/// the same error for every record.
static INIT_FAILURE_REPORTED: AtomicBool = AtomicBool::new(false);

/// Raised when one of the loggers could not be constructed.
#[derive(Debug)]
pub enum InitError {
    /// The log directory did not exist and could not be created.
    CreateDirectory { path: PathBuf, error: std::io::Error },
    /// The log file inside of the log directory could not be opened.
    OpenSink(BuildError),
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InitError::CreateDirectory { error, .. } => Some(error),
            InitError::OpenSink(error) => Some(error),
        }
    }
}

impl Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::CreateDirectory { path, error } => {
                write!(f, "Could not create the log directory '{}' ({})", path.display(), error)
            }
            InitError::OpenSink(error) => Display::fmt(error, f),
        }
    }
}

impl From<BuildError> for InitError {
    fn from(value: BuildError) -> Self {
        InitError::OpenSink(value)
    }
}

/// A `default` and `trace` logger pair built from a [`LogConfig`]. The process-wide loggers are
/// one of these constructed lazily, but components can also be handed a context of their own.
#[derive(Debug, Clone)]
pub struct LoggingContext {
    default: Arc<Logger>,
    trace: Arc<Logger>,
    /// `None` when logging to the console.
    directory: Option<PathBuf>,
}

impl LoggingContext {
    pub fn new(config: &LogConfig) -> Result<Self, InitError> {
        match config.sink {
            SinkChoice::Console => {
                let default = build_default(config)?;
                Ok(Self {
                    trace: default.clone(),
                    default,
                    directory: None,
                })
            }
            SinkChoice::RotatingFile => Ok(Self {
                default: build_default(config)?,
                trace: build_trace(config)?,
                directory: Some(resolve_directory(config)?),
            }),
        }
    }

    pub fn default_logger(&self) -> &Arc<Logger> {
        &self.default
    }

    /// The same logger as [`LoggingContext::default_logger()`] when logging to the console.
    pub fn trace_logger(&self) -> &Arc<Logger> {
        &self.trace
    }

    pub fn log_directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }
}

/// Set the configuration for the process-wide loggers. This can only be done once and only before
/// either logger is used. Returns the configuration back if it was already set. Without calling
/// this the configuration is read from the environment, using the running executable's name.
pub fn configure(config: LogConfig) -> Result<(), LogConfig> {
    CONFIG.set(config)
}

/// The configuration the process-wide loggers are, or will be, built from.
pub fn global_config() -> &'static LogConfig {
    CONFIG.get_or_init(|| LogConfig::from_environment(ExecutableName::current()))
}

/// The process-wide default logger, constructed on first use. Concurrent first calls block until
/// the logger has been constructed by one of them and then all receive the same logger. If
/// construction fails, every later call returns that same error. The first successful call also
/// installs the `log` crate bridge.
pub fn default_logger() -> Result<&'static Arc<Logger>, Arc<InitError>> {
    DEFAULT_LOGGER
        .get_or_init(|| {
            let config = global_config();
            let logger = build_default(config)?;
            logger.log(
                Severity::Info,
                Location::new(file!(), line!()),
                format_args!(
                    "{SERVICE_NAME} {VERSION} ({GIT_COMMIT_HASH}) logging for {}",
                    config.executable_name
                ),
            );
            install_log_bridge(config);

            Ok(logger)
        })
        .as_ref()
        .map_err(Arc::clone)
}

/// The process-wide trace logger for detail that is only needed when chasing down a problem.
/// When logging to the console this is the default logger. Like [`default_logger()`], a failed
/// construction is never retried.
pub fn trace_logger() -> Result<&'static Arc<Logger>, Arc<InitError>> {
    let config = global_config();
    match config.sink {
        SinkChoice::Console => default_logger(),
        SinkChoice::RotatingFile => TRACE_LOGGER
            .get_or_init(|| {
                let logger = build_trace(config)?;
                install_log_bridge(config);

                Ok(logger)
            })
            .as_ref()
            .map_err(Arc::clone),
    }
}

/// The log directory the process-wide loggers write to, creating it if needed.
pub fn log_directory() -> Result<PathBuf, InitError> {
    resolve_directory(global_config())
}

fn resolve_directory(config: &LogConfig) -> Result<PathBuf, InitError> {
    let root = dir::platform_root(config.root.as_deref());
    dir::log_directory(root.as_ref(), &config.executable_name).map_err(|error| {
        InitError::CreateDirectory {
            path: root
                .path()
                .join(SERVICE_NAME)
                .join(config.executable_name.as_str()),
            error,
        }
    })
}

fn build_default(config: &LogConfig) -> Result<Arc<Logger>, InitError> {
    build_logger(
        config,
        format!("{SERVICE_NAME}-DEFAULT"),
        config.default_threshold,
        DEFAULT_LOG_FILE,
        DEFAULT_MAX_FILES,
    )
}

fn build_trace(config: &LogConfig) -> Result<Arc<Logger>, InitError> {
    build_logger(
        config,
        format!("{SERVICE_NAME}-TRACE"),
        config.trace_threshold,
        TRACE_LOG_FILE,
        TRACE_MAX_FILES,
    )
}

fn build_logger(
    config: &LogConfig,
    name: String,
    threshold: Severity,
    file_name: &str,
    max_files: usize,
) -> Result<Arc<Logger>, InitError> {
    let sink = match config.sink {
        SinkChoice::Console => SinkKind::Console,
        SinkChoice::RotatingFile => {
            SinkKind::RotatingFile(resolve_directory(config)?.join(file_name))
        }
    };

    Ok(LoggerBuilder::new(name, threshold)
        .with_sink(sink)
        .with_rotation(RotationPolicy::new(config.max_file_size, max_files))
        .flush_on(config.flush_on)
        .flush_every(Some(config.flush_interval))
        .build()?)
}

/// Which of the process-wide loggers a macro writes to.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    Trace,
}

/// The entry point for the logging macros. Initialization errors can't be returned from a macro,
/// so the first one is printed to STDERR and the record is dropped.
#[doc(hidden)]
pub fn log_to_channel(
    channel: Channel,
    severity: Severity,
    location: Location<'_>,
    args: fmt::Arguments<'_>,
) {
    let logger = match channel {
        Channel::Default => default_logger(),
        Channel::Trace => trace_logger(),
    };

    match logger {
        Ok(logger) => logger.log(severity, location, args),
        Err(err) => {
            if !INIT_FAILURE_REPORTED.swap(true, Ordering::Relaxed) {
                eprintln!("Could not set up logging, log records will be discarded: {err}");
            }
        }
    }
}

/// Routes records from the `log` crate's macros to the process-wide loggers, so dependencies end
/// up in the same files. Trace records go to the trace logger, everything else to the default
/// logger.
struct LogBridge;

static LOG_BRIDGE: LogBridge = LogBridge;

fn channel_for(level: log::Level) -> Channel {
    match level {
        log::Level::Trace => Channel::Trace,
        _ => Channel::Default,
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        let logger = match channel_for(metadata.level()) {
            Channel::Default => default_logger(),
            Channel::Trace => trace_logger(),
        };

        logger
            .map(|logger| logger.enabled(metadata.level().into()))
            .unwrap_or(false)
    }

    fn log(&self, record: &log::Record) {
        log_to_channel(
            channel_for(record.level()),
            record.level().into(),
            Location::new(record.file().unwrap_or("<unknown>"), record.line().unwrap_or(0)),
            *record.args(),
        );
    }

    fn flush(&self) {
        crate::flusher::flush_all();
    }
}

/// Installs the bridge unless the host already installed a logger of its own, in which case that
/// one is left alone. Called by whichever process-wide logger is constructed first.
fn install_log_bridge(config: &LogConfig) {
    let max_level = match config.sink {
        SinkChoice::Console => config.default_threshold,
        SinkChoice::RotatingFile => config.default_threshold.min(config.trace_threshold),
    };

    if log::set_logger(&LOG_BRIDGE).is_ok() {
        log::set_max_level(max_level.as_level_filter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn file_config(root: &Path) -> LogConfig {
        LogConfig::new(ExecutableName::new("registry-test").unwrap())
            .with_sink(SinkChoice::RotatingFile)
            .with_root(root)
    }

    #[test]
    fn file_context_layout() {
        let scratch = tempfile::tempdir().unwrap();
        let context = LoggingContext::new(&file_config(scratch.path())).unwrap();

        let dir = scratch.path().join(SERVICE_NAME).join("registry-test");
        assert_eq!(context.log_directory(), Some(dir.as_path()));
        assert!(dir.join(DEFAULT_LOG_FILE).is_file());
        assert!(dir.join(TRACE_LOG_FILE).is_file());
        assert!(!Arc::ptr_eq(context.default_logger(), context.trace_logger()));
        assert_eq!(context.default_logger().threshold(), Severity::Info);
        assert_eq!(context.trace_logger().threshold(), Severity::Trace);
    }

    #[test]
    fn console_context_aliases_trace() {
        let config =
            LogConfig::new(ExecutableName::new("registry-test").unwrap()).with_sink(SinkChoice::Console);
        let context = LoggingContext::new(&config).unwrap();

        assert!(Arc::ptr_eq(context.default_logger(), context.trace_logger()));
        assert_eq!(context.log_directory(), None);
    }

    #[test]
    fn default_and_trace_files_are_disjoint() {
        let scratch = tempfile::tempdir().unwrap();
        let context = LoggingContext::new(&file_config(scratch.path())).unwrap();
        let dir = context.log_directory().unwrap().to_owned();

        context.default_logger().log(
            Severity::Info,
            Location::new(file!(), line!()),
            format_args!("for the default file"),
        );
        context.trace_logger().log(
            Severity::Info,
            Location::new(file!(), line!()),
            format_args!("for the trace file"),
        );
        context.default_logger().flush();
        context.trace_logger().flush();

        let default = fs::read_to_string(dir.join(DEFAULT_LOG_FILE)).unwrap();
        let trace = fs::read_to_string(dir.join(TRACE_LOG_FILE)).unwrap();
        assert!(default.contains("for the default file"));
        assert!(!default.contains("for the trace file"));
        assert!(trace.contains("for the trace file"));
        assert!(!trace.contains("for the default file"));
    }

    #[test]
    fn unusable_roots_are_fatal() {
        let scratch = tempfile::tempdir().unwrap();
        let blocker = scratch.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let error = LoggingContext::new(&file_config(&blocker)).unwrap_err();
        assert!(matches!(error, InitError::CreateDirectory { .. }));
        assert!(error.to_string().contains("registry-test"));
    }

    #[test]
    fn default_rotation_keeps_three_files() {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = file_config(scratch.path());
        config.max_file_size = 512;
        let context = LoggingContext::new(&config).unwrap();

        for i in 0..200 {
            context.default_logger().log(
                Severity::Error,
                Location::new(file!(), line!()),
                format_args!("rotation filler {i}"),
            );
        }

        let dir = context.log_directory().unwrap();
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["log.1.txt", "log.2.txt", "log.txt", "poll.txt"]);
    }
}
