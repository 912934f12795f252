//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the collector to work with both the real
//! sysfs on Linux and mock implementations for testing in CI.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Opens a file and issues exactly one read into `buf`.
    ///
    /// Unlike `read_to_string`, this never loops until EOF, so a driver that
    /// keeps answering `EAGAIN` produces an error instead of a busy wait.
    ///
    /// # Returns
    /// The number of bytes read, or the I/O error from open or read.
    fn read_once(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize>;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Returns `true` if `path` is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a regular file, following symlinks.
    fn is_file(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/sys` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_once(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize> {
        // `File::read` maps to a single read(2); the handle closes on drop.
        let mut file = File::open(path)?;
        file.read(buf)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
