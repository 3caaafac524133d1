//! Download-root usage for the stats report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{LeechError, Result};
use crate::progress::format_bytes;
use crate::storage::available_space;

/// Snapshot returned by `Leech::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeechStats {
    pub download_dir: PathBuf,
    pub active_jobs: usize,
    /// Regular files anywhere under the download root.
    pub files: u64,
    pub total_bytes: u64,
    /// Free space on the root's filesystem, when it can be queried.
    pub available_bytes: Option<u64>,
}

impl LeechStats {
    pub fn render(&self) -> String {
        let mut text = format!(
            "📊 Bot Statistics\n\n📁 Download Directory: {}\n🔄 Active jobs: {}\n📦 Files: {}\n💾 Total Size: {}",
            self.download_dir.display(),
            self.active_jobs,
            self.files,
            format_bytes(self.total_bytes)
        );
        if let Some(free) = self.available_bytes {
            text.push_str(&format!("\n🗄 Free Space: {}", format_bytes(free)));
        }
        text
    }
}

/// Count regular files and their total size under `root`, recursively.
/// A missing root counts as empty. Symlinks are not followed.
pub fn dir_usage(root: &Path) -> io::Result<(u64, u64)> {
    let mut files = 0u64;
    let mut bytes = 0u64;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files += 1;
                bytes += entry.metadata()?.len();
            }
        }
    }
    Ok((files, bytes))
}

pub(super) fn collect(root: &Path) -> Result<LeechStats> {
    let (files, total_bytes) = dir_usage(root).map_err(|e| LeechError::fs(root, e))?;
    Ok(LeechStats {
        download_dir: root.to_path_buf(),
        active_jobs: 0,
        files,
        total_bytes,
        available_bytes: available_space(root).ok(),
    })
}
