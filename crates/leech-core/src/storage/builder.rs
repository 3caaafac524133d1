//! Builder for creating and preallocating temp download files.

use std::fs::File;
use std::path::Path;

use super::writer::StorageWriter;
use crate::error::{LeechError, Result};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Builder for a new temp download file. Call `preallocate` (when the size is
/// known) then `build` to get a `StorageWriter`.
pub struct StorageWriterBuilder {
    file: File,
    temp_path: std::path::PathBuf,
}

impl StorageWriterBuilder {
    /// Create a new temp file at `temp_path` (e.g. `destination.part`).
    /// Overwrites if the path already exists.
    pub fn create(temp_path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .map_err(|e| LeechError::fs(temp_path, e))?;
        Ok(StorageWriterBuilder {
            file,
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` so a full disk
    /// is detected before the transfer starts; falls back to `set_len`.
    pub fn preallocate(&mut self, size: u64) -> Result<()> {
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            // SAFETY: fd is a valid open descriptor owned by self.file for the duration of the call.
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            if r == libc::ENOSPC {
                return Err(LeechError::FileSystem(format!(
                    "{}: no space left to allocate {} bytes",
                    self.temp_path.display(),
                    size
                )));
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file
            .set_len(size)
            .map_err(|e| LeechError::fs(&self.temp_path, e))?;
        Ok(())
    }

    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.temp_path)
    }
}
