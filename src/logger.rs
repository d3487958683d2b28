//! The logger implementation itself.

use once_cell::sync::Lazy;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::severity::Severity;
use crate::target::SinkImpl;

/// `[MM-DD HH:MM:SS:mmm]`, the timestamp at the start of every record.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[month]-[day] [hour]:[minute]:[second]:[subsecond digits:3]");

/// Determining the local offset is only sound while the process is still single threaded on some
/// platforms, and `time` refuses to do it otherwise. It's looked up once and then reused, falling
/// back to UTC.
static LOCAL_OFFSET: Lazy<UtcOffset> =
    Lazy::new(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));

/// Source of the small per-thread numbers written in the thread column.
static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static THREAD_ID: usize = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Where a record was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> Location<'a> {
    pub const fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }

    /// Only the file name is printed, not the full path.
    fn file_name(&self) -> &'a str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }
}

/// A named logger with a severity threshold writing to a single sink. Construct one using the
/// [`LoggerBuilder`][crate::LoggerBuilder], or get one of the process-wide loggers through
/// [`default_logger()`][crate::default_logger()] and [`trace_logger()`][crate::trace_logger()].
#[derive(Debug)]
pub struct Logger {
    name: String,
    /// Records below this severity are discarded before they're formatted.
    threshold: Severity,
    /// Records at or above this severity are flushed before [`Logger::log()`] returns.
    flush_on: Severity,
    sink: Mutex<SinkImpl>,
    /// Records that could not be written because the sink returned an error.
    dropped_records: AtomicU64,
}

impl Logger {
    pub(crate) fn new(name: String, threshold: Severity, flush_on: Severity, sink: SinkImpl) -> Self {
        Self {
            name,
            threshold,
            flush_on,
            sink: Mutex::new(sink),
            dropped_records: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }

    /// The number of records lost to write errors so far.
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    /// Format and write a record. Records below the threshold are ignored entirely. Write errors
    /// are swallowed since logging should never take down the process, but they are counted in
    /// [`Logger::dropped_records()`].
    pub fn log(&self, severity: Severity, location: Location<'_>, args: fmt::Arguments<'_>) {
        if !self.enabled(severity) {
            return;
        }

        let mut line = Vec::with_capacity(128);
        if format_record(&mut line, severity, location, args).is_err() {
            self.dropped_records.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut sink = self.lock_sink();
        let mut result = sink.write_record(severity, &line);
        if result.is_ok() && severity >= self.flush_on {
            result = sink.flush();
        }
        if result.is_err() {
            self.dropped_records.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Write out all buffered records.
    pub fn flush(&self) {
        // There's nobody to report a failed flush to, the records will be counted as dropped when
        // the next write fails
        let _ = self.lock_sink().flush();
    }

    /// A panic while holding the lock can only have happened in the middle of writing a record,
    /// which leaves the sink itself perfectly usable.
    fn lock_sink(&self) -> MutexGuard<'_, SinkImpl> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writes `[MM-DD HH:MM:SS:mmm][L][pid:tid  ][file:line] message` followed by a line feed.
fn format_record(
    buffer: &mut Vec<u8>,
    severity: Severity,
    location: Location<'_>,
    args: fmt::Arguments<'_>,
) -> std::io::Result<()> {
    let now = OffsetDateTime::now_utc().to_offset(*LOCAL_OFFSET);
    buffer.push(b'[');
    now.format_into(buffer, TIMESTAMP_FORMAT)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let thread_id = THREAD_ID.with(|id| *id);
    writeln!(
        buffer,
        "][{}][{}:{:<5}][{}:{}] {}",
        severity.short_name(),
        std::process::id(),
        thread_id,
        location.file_name(),
        location.line,
        args
    )
}
