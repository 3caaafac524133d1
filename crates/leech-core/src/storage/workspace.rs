//! Per-job working directories under the download root.

use std::path::{Path, PathBuf};

use crate::error::{LeechError, Result};
use crate::job::JobId;

/// A job's private subdirectory (`<root>/job-<id>`). Jobs only ever write
/// inside their own workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    /// Path of the workspace for `id` without touching the disk.
    pub fn for_job(root: &Path, id: JobId) -> Self {
        Self {
            dir: root.join(format!("job-{}", id)),
        }
    }

    /// Create the workspace directory (and the root if needed).
    pub async fn create(root: &Path, id: JobId) -> Result<Self> {
        let ws = Self::for_job(root, id);
        tokio::fs::create_dir_all(&ws.dir)
            .await
            .map_err(|e| LeechError::fs(&ws.dir, e))?;
        Ok(ws)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }

    /// Recursively delete the workspace. Removing a missing workspace is not an error.
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LeechError::fs(&self.dir, e)),
        }
    }
}
