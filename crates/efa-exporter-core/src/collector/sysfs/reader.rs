//! Bounded single-read access to sysfs attribute files.

use std::io;
use std::path::Path;

use crate::collector::traits::FileSystem;

/// Largest attribute value we are willing to read from one sysfs file.
pub const SYSFS_READ_BUFFER_SIZE: usize = 128;

/// Reads a sysfs attribute with a single read of at most 128 bytes and
/// returns the whitespace-trimmed text.
///
/// Some drivers answer reads with `EAGAIN` indefinitely, which turns a
/// read-until-EOF loop into a hang. A single read either returns data or
/// fails, and the failure is handed back to the caller untouched.
pub fn read_sysfs_value<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> io::Result<String> {
    let mut buf = [0u8; SYSFS_READ_BUFFER_SIZE];
    let n = fs.read_once(path, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf[..n]).trim().to_string())
}

/// Returns `true` for read failures that mean "this attribute is not
/// available here" rather than a broken system.
///
/// Covers missing files, permission errors, `EOPNOTSUPP`/`ENOTSUP` and
/// `EINVAL`, which drivers return for counters the hardware does not
/// implement.
pub fn is_unavailable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::Unsupported
            | io::ErrorKind::InvalidInput
    ) || err.raw_os_error() == Some(libc::EOPNOTSUPP)
        || err.raw_os_error() == Some(libc::ENOTSUP)
}
