//! A file sink that starts over in a fresh file once the current one grows too large. Split off
//! into a module because the archive shuffling is the only part of the sinks with real logic.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::MAX_FILE_SIZE;

/// When to rotate a log file, and how many files to keep around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// A record that would grow the file past this many bytes is written to a fresh file instead.
    pub max_size: u64,
    /// The number of files kept on disk, including the one currently being written to. With a
    /// value of 1 no history is kept at all and the file is simply truncated.
    pub max_files: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: MAX_FILE_SIZE,
            max_files: 1,
        }
    }
}

impl RotationPolicy {
    pub fn new(max_size: u64, max_files: usize) -> Self {
        Self {
            max_size,
            max_files: max_files.max(1),
        }
    }
}

/// Buffered writes to `path`, with `log.txt` being archived as `log.1.txt`, `log.2.txt`, and so
/// on.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    writer: BufWriter<File>,
    current_size: u64,
}

impl RotatingFile {
    /// Open or create the file at `path`. Existing contents are kept and count towards the size
    /// limit.
    pub fn open<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> io::Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::options().create(true).append(true).open(&path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            path,
            policy,
            writer: BufWriter::with_capacity(8192, file),
            current_size,
        })
    }

    /// Append a complete record. The record is never split across two files. A failed rotation
    /// doesn't lose the record, it's appended to the current file instead.
    pub fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        let len = record.len() as u64;
        if self.current_size > 0 && self.current_size + len > self.policy.max_size {
            if let Err(err) = self.rotate() {
                eprintln!("Could not rotate '{}': {err}", self.path.display());
            }
        }

        self.writer.write_all(record)?;
        self.current_size += len;

        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        // The live file is moved last, so after any error it's still in place and its records
        // must be kept. Either way the size starts over, so the next attempt only happens once
        // another file's worth of records has been written.
        let shifted = self.shift_archives();
        let file = match shifted {
            Ok(()) => File::options()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?,
            Err(_) => File::options().create(true).append(true).open(&self.path)?,
        };
        self.writer = BufWriter::with_capacity(8192, file);
        self.current_size = 0;

        shifted
    }

    /// Moves `log.txt` to `log.1.txt`, `log.1.txt` to `log.2.txt`, and so on. The last archive is
    /// overwritten by its predecessor.
    fn shift_archives(&self) -> io::Result<()> {
        for index in (1..self.policy.max_files).rev() {
            let source = archive_path(&self.path, index - 1);
            if !source.exists() {
                continue;
            }

            let target = archive_path(&self.path, index);
            if target.exists() {
                fs::remove_file(&target)?;
            }
            fs::rename(&source, &target)?;
        }

        Ok(())
    }
}

/// The path of the `index`th archive of `base`, where index 0 is the file itself. The index goes
/// before the extension, so `log.txt` becomes `log.1.txt`.
pub fn archive_path(base: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return base.to_owned();
    }

    match (base.file_stem(), base.extension()) {
        (Some(stem), Some(extension)) => base.with_file_name(format!(
            "{}.{index}.{}",
            stem.to_string_lossy(),
            extension.to_string_lossy()
        )),
        _ => {
            let name = base
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            base.with_file_name(format!("{name}.{index}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn archive_names() {
        let base = Path::new("/var/log/svc/log.txt");
        assert_eq!(archive_path(base, 0), PathBuf::from("/var/log/svc/log.txt"));
        assert_eq!(archive_path(base, 1), PathBuf::from("/var/log/svc/log.1.txt"));
        assert_eq!(archive_path(base, 2), PathBuf::from("/var/log/svc/log.2.txt"));
        assert_eq!(archive_path(Path::new("/tmp/log"), 3), PathBuf::from("/tmp/log.3"));
    }

    #[test]
    fn keeps_at_most_max_files() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("log.txt");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(64, 3)).unwrap();

        for i in 0..50 {
            file.write_record(format!("record number {i:04} with padding\n").as_bytes())
                .unwrap();
        }
        file.flush().unwrap();

        assert_eq!(files_in(scratch.path()), ["log.1.txt", "log.2.txt", "log.txt"]);
        // The newest records live in the current file, the oldest archive holds older ones
        let current = fs::read_to_string(&path).unwrap();
        let oldest = fs::read_to_string(scratch.path().join("log.2.txt")).unwrap();
        assert!(current.contains("record number 0049"));
        assert!(!oldest.contains("record number 0049"));
        assert!(!oldest.contains("record number 0000"));
    }

    #[test]
    fn single_file_policy_truncates() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("poll.txt");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(64, 1)).unwrap();

        for i in 0..20 {
            file.write_record(format!("poll {i:04} and some more text\n").as_bytes())
                .unwrap();
        }
        file.flush().unwrap();

        assert_eq!(files_in(scratch.path()), ["poll.txt"]);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("poll 0019"));
        assert!(!contents.contains("poll 0000"));
        assert!(contents.len() as u64 <= 64);
    }

    #[test]
    fn records_are_never_split() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("log.txt");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(40, 2)).unwrap();

        file.write_record(b"0123456789012345678901234567890\n").unwrap();
        file.write_record(b"second record that does not fit\n").unwrap();
        file.flush().unwrap();

        assert_eq!(
            fs::read_to_string(scratch.path().join("log.1.txt")).unwrap(),
            "0123456789012345678901234567890\n"
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "second record that does not fit\n"
        );
    }

    #[test]
    fn failed_rotation_keeps_the_live_file() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("log.txt");
        // A non-empty directory where the archive should go can't be replaced
        let archive = scratch.path().join("log.1.txt");
        fs::create_dir(&archive).unwrap();
        fs::write(archive.join("occupied"), b"").unwrap();

        let mut file = RotatingFile::open(&path, RotationPolicy::new(40, 2)).unwrap();
        file.write_record(b"0123456789012345678901234567890\n").unwrap();
        file.write_record(b"second record that does not fit\n").unwrap();
        file.flush().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "0123456789012345678901234567890\nsecond record that does not fit\n"
        );
        assert!(archive.is_dir());
        assert_eq!(file.current_size, 32);
    }

    #[test]
    fn oversized_records_still_get_written() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("log.txt");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(8, 2)).unwrap();

        file.write_record(b"this is much longer than eight bytes\n").unwrap();
        file.flush().unwrap();

        assert_eq!(file.current_size, 37);
        assert_eq!(files_in(scratch.path()), ["log.txt"]);
    }

    #[test]
    fn existing_contents_count_towards_the_limit() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("log.txt");
        fs::write(&path, b"left over from a previous run\n").unwrap();

        let mut file = RotatingFile::open(&path, RotationPolicy::new(40, 2)).unwrap();
        assert_eq!(file.current_size, 30);
        file.write_record(b"new run starts here\n").unwrap();
        file.flush().unwrap();

        assert_eq!(
            fs::read_to_string(scratch.path().join("log.1.txt")).unwrap(),
            "left over from a previous run\n"
        );
    }
}
