//! Offset writer for temp download files.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

use crate::error::{LeechError, Result};

/// Writer for a temp download file. Cheap to clone so the curl write
/// callback can own one while the caller keeps another for finalize/discard.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, temp_path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            temp_path,
        }
    }

    /// Write `data` at `offset` (pwrite-style; does not move a shared cursor).
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Truncate to `len` bytes (drops preallocated tail when the server sent less).
    pub fn truncate(&self, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .map_err(|e| LeechError::fs(&self.temp_path, e))
    }

    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| LeechError::fs(&self.temp_path, e))
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the temp file to the final path. Consumes the writer.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        std::fs::rename(&temp_path, final_path).map_err(|e| {
            LeechError::FileSystem(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ))
        })
    }

    /// Remove the temp file (failed or aborted transfer). Missing file is fine.
    pub fn discard(self) {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        match std::fs::remove_file(&temp_path) {
            Ok(()) => tracing::debug!(path = %temp_path.display(), "removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %temp_path.display(), "could not remove partial file: {}", e),
        }
    }
}
