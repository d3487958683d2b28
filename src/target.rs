//! The loggers' output targets.

use std::fmt::Debug;
use std::io::{self, Write};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use crate::severity::Severity;

pub mod rotating;

pub use rotating::{RotatingFile, RotationPolicy};

/// Similar to [`crate::builder::SinkKind`], but contains the actual handles needed to write to
/// the sink.
pub enum SinkImpl {
    /// Writes directly to STDERR. Every record is written in one go, so there is nothing to
    /// flush. May use colors depending on the environment.
    Console(BufferWriter),
    /// Buffered writes to a size-rotated file.
    RotatingFile(RotatingFile),
}

impl Debug for SinkImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkImpl::Console(stderr) => f
                .debug_tuple("Console")
                .field(if stderr.buffer().supports_color() {
                    &"<stderr stream with color support>"
                } else {
                    &"<stderr stream>"
                })
                .finish(),
            SinkImpl::RotatingFile(file) => f.debug_tuple("RotatingFile").field(file).finish(),
        }
    }
}

impl SinkImpl {
    /// Construct a [`SinkImpl`] that writes to STDERR with optional color support determined by
    /// the environment.
    pub fn new_console() -> Self {
        SinkImpl::Console(BufferWriter::stderr(stderr_color_support()))
    }

    /// Write a single formatted record, including its trailing line feed. On the console the
    /// whole line is colored according to the record's severity.
    pub fn write_record(&mut self, severity: Severity, line: &[u8]) -> io::Result<()> {
        match self {
            SinkImpl::Console(stderr) => {
                let mut buffer = stderr.buffer();
                let (text, line_feed) = match line.strip_suffix(b"\n") {
                    Some(text) => (text, &b"\n"[..]),
                    None => (line, &b""[..]),
                };

                buffer.set_color(&severity_color(severity))?;
                buffer.write_all(text)?;
                buffer.reset()?;
                buffer.write_all(line_feed)?;

                stderr.print(&buffer)
            }
            SinkImpl::RotatingFile(file) => file.write_record(line),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            SinkImpl::Console(_) => Ok(()),
            SinkImpl::RotatingFile(file) => file.flush(),
        }
    }
}

fn severity_color(severity: Severity) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match severity {
        Severity::Trace => spec.set_fg(Some(Color::White)),
        Severity::Debug => spec.set_fg(Some(Color::Cyan)),
        Severity::Info => spec.set_fg(Some(Color::Green)),
        Severity::Warn => spec.set_fg(Some(Color::Yellow)).set_bold(true),
        Severity::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
        Severity::Critical => spec
            .set_fg(Some(Color::White))
            .set_bg(Some(Color::Red))
            .set_bold(true),
    };

    spec
}

/// Whether to use colors when outputting to STDERR. Considers the `CLICOLOR`, `CLICOLOR_FORCE`, and
/// `NO_COLOR` environment variables, and whether or not STDERR is attached to a real TTY.
fn stderr_color_support() -> ColorChoice {
    if let Ok(value) = std::env::var("CLICOLOR_FORCE") {
        if value.trim() != "0" {
            return ColorChoice::Always;
        }
    }

    if let Ok(value) = std::env::var("NO_COLOR") {
        if value.trim() != "0" {
            return ColorChoice::Never;
        }
    }

    if let Ok(value) = std::env::var("CLICOLOR") {
        if value.trim() == "0" {
            return ColorChoice::Never;
        }
    }

    if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}
