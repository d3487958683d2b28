//! A builder interface for individual loggers.
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FLUSH_INTERVAL;
use crate::flusher;
use crate::logger::Logger;
use crate::severity::Severity;
use crate::target::{RotatingFile, RotationPolicy, SinkImpl};

/// Constructs a [`Logger`].
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    threshold: Severity,
    flush_on: Severity,
    sink: SinkKind,
    rotation: RotationPolicy,
    /// If set, the logger is flushed by the background flusher at (roughly) this interval.
    flush_every: Option<Duration>,
}

/// Determines where the logger writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    /// Write directly to STDERR.
    Console,
    /// Write the log output to a file, rotating it according to the builder's
    /// [`RotationPolicy`].
    RotatingFile(PathBuf),
}

/// An error raised when building a logger. This can be converted back to the builder using
/// `Into<LoggerBuilder>`.
#[derive(Debug)]
pub enum BuildError {
    FileOpenError {
        builder: LoggerBuilder,
        path: PathBuf,
        error: std::io::Error,
    },
}

impl From<BuildError> for LoggerBuilder {
    fn from(value: BuildError) -> Self {
        match value {
            BuildError::FileOpenError { builder, .. } => builder,
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::FileOpenError { error, .. } => Some(error),
        }
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::FileOpenError {
                builder: _,
                path,
                error,
            } => {
                write!(f, "Could not open '{}' ({})", path.display(), error)
            }
        }
    }
}

impl LoggerBuilder {
    /// A console logger that discards everything below `threshold`, flushes on warnings, and is
    /// periodically flushed in the background.
    pub fn new(name: impl Into<String>, threshold: Severity) -> Self {
        Self {
            name: name.into(),
            threshold,
            flush_on: Severity::Warn,
            sink: SinkKind::Console,
            rotation: RotationPolicy::default(),
            flush_every: Some(FLUSH_INTERVAL),
        }
    }

    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Only used for [`SinkKind::RotatingFile`].
    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Records at or above `severity` are flushed before the logging call returns.
    pub fn flush_on(mut self, severity: Severity) -> Self {
        self.flush_on = severity;
        self
    }

    /// Have the background flusher flush this logger periodically, or not at all when `None`.
    /// There is only a single flusher thread, and it runs at the interval of the first logger
    /// that registers with it.
    pub fn flush_every(mut self, interval: Option<Duration>) -> Self {
        self.flush_every = interval;
        self
    }

    /// Open the sink and construct the logger. For file sinks the file is opened (and created if
    /// needed) right away so a logger that can't write is never handed out.
    pub fn build(self) -> Result<Arc<Logger>, BuildError> {
        let sink = match &self.sink {
            SinkKind::Console => Ok(SinkImpl::new_console()),
            SinkKind::RotatingFile(path) => RotatingFile::open(path, self.rotation)
                .map(SinkImpl::RotatingFile)
                .map_err(|error| (path.clone(), error)),
        };
        let sink = match sink {
            Ok(sink) => sink,
            Err((path, error)) => {
                return Err(BuildError::FileOpenError {
                    builder: self,
                    path,
                    error,
                })
            }
        };

        let logger = Arc::new(Logger::new(self.name, self.threshold, self.flush_on, sink));
        if let Some(interval) = self.flush_every {
            flusher::register(&logger, interval);
        }

        Ok(logger)
    }
}
