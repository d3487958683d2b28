//! Build-time constants and the runtime configuration for the process-wide loggers.

use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use crate::severity::Severity;

/// The environment variable for overriding the sink. Either `console` or `file`, case
/// insensitive. Anything else is ignored.
pub const SVC_LOG_ENV: &str = "SVC_LOG";
/// The environment variable for overriding the root directory the service's log directory is
/// created under.
pub const SVC_LOG_DIR_ENV: &str = "SVC_LOG_DIR";

/// The service's display name. Used as the middle component of the log directory.
pub const SERVICE_NAME: &str = match option_env!("SVC_LOG_SERVICE_NAME") {
    Some(name) => name,
    None => "CodeForHHTechShare",
};
/// The service's version string.
pub const VERSION: &str = match option_env!("SVC_LOG_VERSION") {
    Some(version) => version,
    None => "Version Not Defined",
};
/// The source control revision the service was built from.
pub const GIT_COMMIT_HASH: &str = match option_env!("GIT_COMMIT_HASH") {
    Some(hash) => hash,
    None => "COMMIT",
};

/// Maximum size of a single log file before it gets rotated.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 5;
/// How often buffered records are flushed regardless of their severity.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(3);

/// Whether the process-wide loggers write to the console or to rotating files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkChoice {
    /// Both loggers write to STDERR and the trace logger is an alias for the default logger.
    Console,
    /// Both loggers write to their own rotating file in the log directory.
    RotatingFile,
}

impl SinkChoice {
    /// Console output for debug builds, files for release builds.
    pub fn for_build_profile() -> Self {
        if cfg!(debug_assertions) {
            SinkChoice::Console
        } else {
            SinkChoice::RotatingFile
        }
    }

    /// Parse the value of the `SVC_LOG` environment variable.
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("console") || value.eq_ignore_ascii_case("stderr") {
            Some(SinkChoice::Console)
        } else if value.eq_ignore_ascii_case("file") {
            Some(SinkChoice::RotatingFile)
        } else {
            None
        }
    }
}

/// The name of the executable embedding the loggers. Namespaces the log directory, so it must be
/// usable as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutableName(String);

/// Raised when an [`ExecutableName`] could not be used as a directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidExecutableName(pub String);

impl Error for InvalidExecutableName {}

impl Display for InvalidExecutableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid executable name for a log directory", self.0)
    }
}

impl ExecutableName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidExecutableName> {
        let name = name.into();
        let valid = !name.trim().is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);

        if valid {
            Ok(Self(name))
        } else {
            Err(InvalidExecutableName(name))
        }
    }

    /// The file stem of the running executable, or the service name if that can't be determined.
    pub fn current() -> Self {
        std::env::current_exe()
            .ok()
            .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .and_then(|stem| Self::new(stem).ok())
            .unwrap_or_else(|| Self(SERVICE_NAME.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExecutableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to construct the `default` and `trace` loggers.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub executable_name: ExecutableName,
    /// Overrides the platform's log root. The service and executable directories are still
    /// appended to this.
    pub root: Option<PathBuf>,
    pub sink: SinkChoice,
    pub default_threshold: Severity,
    pub trace_threshold: Severity,
    /// Records at or above this severity are flushed before the logging call returns.
    pub flush_on: Severity,
    pub flush_interval: Duration,
    pub max_file_size: u64,
}

impl LogConfig {
    /// The stock configuration for the build profile, without looking at the environment.
    pub fn new(executable_name: ExecutableName) -> Self {
        Self {
            executable_name,
            root: None,
            sink: SinkChoice::for_build_profile(),
            default_threshold: Severity::Info,
            trace_threshold: Severity::Trace,
            flush_on: Severity::Warn,
            flush_interval: FLUSH_INTERVAL,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// The stock configuration with the `SVC_LOG` and `SVC_LOG_DIR` overrides applied.
    pub fn from_environment(executable_name: ExecutableName) -> Self {
        let mut config = Self::new(executable_name);
        config.apply_overrides(
            std::env::var(SVC_LOG_ENV).ok().as_deref(),
            std::env::var_os(SVC_LOG_DIR_ENV).map(PathBuf::from),
        );

        config
    }

    fn apply_overrides(&mut self, sink: Option<&str>, root: Option<PathBuf>) {
        if let Some(sink_str) = sink.filter(|value| !value.trim().is_empty()) {
            match SinkChoice::parse(sink_str) {
                Some(sink) => self.sink = sink,
                None => eprintln!(
                    "Ignoring unknown {SVC_LOG_ENV} value '{sink_str}', expected 'console' or \
                     'file'"
                ),
            }
        }

        if let Some(root) = root.filter(|root| !root.as_os_str().is_empty()) {
            self.root = Some(root);
        }
    }

    pub fn with_sink(mut self, sink: SinkChoice) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}
