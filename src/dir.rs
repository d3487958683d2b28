//! Resolving and creating the per-executable log directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ExecutableName, SERVICE_NAME};

/// The platform specific directory all services keep their logs under.
pub trait LogRoot: Send + Sync {
    fn path(&self) -> PathBuf;
}

/// `%ProgramData%`, normally `C:\ProgramData`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramDataRoot;

/// `/var/log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixRoot;

/// An explicitly chosen root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRoot(pub PathBuf);

#[cfg(windows)]
impl LogRoot for ProgramDataRoot {
    fn path(&self) -> PathBuf {
        known_folder_program_data()
            .or_else(|| std::env::var_os("ProgramData").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
    }
}

impl LogRoot for PosixRoot {
    fn path(&self) -> PathBuf {
        PathBuf::from("/var/log")
    }
}

impl LogRoot for FixedRoot {
    fn path(&self) -> PathBuf {
        self.0.clone()
    }
}

/// The root for the current platform, or `root` if one was configured explicitly.
pub fn platform_root(root: Option<&Path>) -> Box<dyn LogRoot> {
    match root {
        Some(root) => Box::new(FixedRoot(root.to_owned())),
        #[cfg(windows)]
        None => Box::new(ProgramDataRoot),
        #[cfg(not(windows))]
        None => Box::new(PosixRoot),
    }
}

/// Returns `<root>/<service name>/<executable name>`, creating the directory and its parents if
/// they don't exist yet. Calling this again for a directory that already exists is fine.
pub fn log_directory(root: &dyn LogRoot, executable_name: &ExecutableName) -> io::Result<PathBuf> {
    let dir = root.path().join(SERVICE_NAME).join(executable_name.as_str());
    if !dir.is_dir() {
        fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

#[cfg(windows)]
fn known_folder_program_data() -> Option<PathBuf> {
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{FOLDERID_ProgramData, SHGetKnownFolderPath, KF_FLAG_DEFAULT};

    let path = unsafe { SHGetKnownFolderPath(&FOLDERID_ProgramData, KF_FLAG_DEFAULT, HANDLE(0)) }
        .ok()?;
    // The string is allocated by the shell and needs to be freed even if it isn't valid UTF-16
    let result = unsafe { path.to_string() }.ok().map(PathBuf::from);
    unsafe { CoTaskMemFree(Some(path.0 as *const _)) };

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_layout() {
        let scratch = tempfile::tempdir().unwrap();
        let root = FixedRoot(scratch.path().to_owned());
        let exe = ExecutableName::new("gateway").unwrap();

        let dir = log_directory(&root, &exe).unwrap();
        assert_eq!(dir, scratch.path().join(SERVICE_NAME).join("gateway"));
        assert!(dir.is_dir());
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let scratch = tempfile::tempdir().unwrap();
        let root = FixedRoot(scratch.path().to_owned());
        let exe = ExecutableName::new("gateway").unwrap();

        let first = log_directory(&root, &exe).unwrap();
        let second = log_directory(&root, &exe).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn creation_failures_are_reported() {
        let scratch = tempfile::tempdir().unwrap();
        // A regular file can't have children
        let blocker = scratch.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let root = FixedRoot(blocker);
        let exe = ExecutableName::new("gateway").unwrap();
        assert!(log_directory(&root, &exe).is_err());
    }

    #[test]
    fn explicit_roots_win() {
        let root = platform_root(Some(Path::new("/srv/logs")));
        assert_eq!(root.path(), PathBuf::from("/srv/logs"));
    }
}
