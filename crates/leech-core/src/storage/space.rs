//! Free-space checks for the download filesystem.

use std::path::Path;

use crate::error::{LeechError, Result};

/// Bytes available to unprivileged users on the filesystem holding `dir`.
#[cfg(unix)]
pub fn available_space(dir: &Path) -> std::io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: statvfs only writes into the zeroed struct we pass; c_path is NUL-terminated.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let r = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if r != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

#[cfg(not(unix))]
pub fn available_space(_dir: &Path) -> std::io::Result<u64> {
    Ok(u64::MAX)
}

/// Fail with `FileSystem` if fewer than `needed` bytes are free under `dir`.
/// A failing statvfs is logged and treated as "enough space".
pub fn ensure_space(dir: &Path, needed: u64) -> Result<()> {
    match available_space(dir) {
        Ok(free) if free < needed => Err(LeechError::FileSystem(format!(
            "{}: {} bytes needed but only {} available",
            dir.display(),
            needed,
            free
        ))),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), "statvfs failed: {}", e);
            Ok(())
        }
    }
}
