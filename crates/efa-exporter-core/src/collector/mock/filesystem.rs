//! In-memory mock filesystem for testing collectors without a real `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run in CI environments without EFA hardware.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various sysfs states, including files whose read fails with a specific
/// errno the way misbehaving drivers do.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Files that exist but fail on read with the given errno.
    failing: HashMap<PathBuf, i32>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.failing.remove(&path);
        self.files.insert(path, content.into());
    }

    /// Adds a regular file whose every read fails with `errno`.
    ///
    /// Use `libc` constants, e.g. `libc::EOPNOTSUPP` or `libc::EAGAIN`.
    pub fn add_failing_file(&mut self, path: impl AsRef<Path>, errno: i32) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.remove(&path);
        self.failing.insert(path, errno);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a file or an empty directory.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.remove(path);
        self.failing.remove(path);
        self.directories.remove(path);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn contains_file(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.failing.contains_key(path)
    }
}

impl FileSystem for MockFs {
    fn read_once(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(&errno) = self.failing.get(path) {
            return Err(io::Error::from_raw_os_error(errno));
        }
        if self.directories.contains(path) {
            return Err(io::Error::from_raw_os_error(libc::EISDIR));
        }

        let content = self.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })?;

        let bytes = content.as_bytes();
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        // Find all files and directories that are direct children
        for file_path in self.files.keys().chain(self.failing.keys()) {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.contains_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(fs: &MockFs, path: &str) -> io::Result<String> {
        let mut buf = [0u8; 64];
        let n = fs.read_once(Path::new(path), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
    }

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/infiniband/efa0/ports/1/state", "4: ACTIVE\n");

        assert!(fs.is_file(Path::new("/sys/class/infiniband/efa0/ports/1/state")));
        assert!(fs.is_dir(Path::new("/sys/class/infiniband/efa0/ports/1")));
        assert!(fs.is_dir(Path::new("/sys")));

        let content = read(&fs, "/sys/class/infiniband/efa0/ports/1/state").unwrap();
        assert_eq!(content, "4: ACTIVE\n");
    }

    #[test]
    fn test_mock_fs_read_once_truncates_to_buffer() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/long", "y".repeat(200));

        let mut buf = [0u8; 128];
        let n = fs.read_once(Path::new("/sys/long"), &mut buf).unwrap();
        assert_eq!(n, 128);
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/infiniband/efa0/ports/1/state", "4: ACTIVE");
        fs.add_file("/sys/class/infiniband/efa0/ports/1/rate", "100 Gb/sec");
        fs.add_file("/sys/class/infiniband/efa1/ports/1/state", "4: ACTIVE");
        fs.add_failing_file("/sys/class/infiniband/efa0/ports/1/phys_state", libc::EAGAIN);

        let devices = fs.read_dir(Path::new("/sys/class/infiniband")).unwrap();
        assert_eq!(devices.len(), 2); // efa0 and efa1

        let port = fs
            .read_dir(Path::new("/sys/class/infiniband/efa0/ports/1"))
            .unwrap();
        assert_eq!(port.len(), 3); // state, rate and the failing phys_state
    }

    #[test]
    fn test_mock_fs_failing_file() {
        let mut fs = MockFs::new();
        fs.add_failing_file("/sys/hw_counters/lifespan", libc::EACCES);

        assert!(fs.is_file(Path::new("/sys/hw_counters/lifespan")));
        let err = read(&fs, "/sys/hw_counters/lifespan").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(err.raw_os_error(), Some(libc::EACCES));
    }

    #[test]
    fn test_mock_fs_remove() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/a/b", "1");
        fs.remove("/sys/a/b");
        assert!(!fs.is_file(Path::new("/sys/a/b")));
        assert!(fs.read_dir(Path::new("/sys/a")).unwrap().is_empty());
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = read(&fs, "/nonexistent");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(
            fs.read_dir(Path::new("/nonexistent")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
