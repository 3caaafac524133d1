//! Finalizer: release external handles and local files of a terminal job,
//! then drop it from the registry.

use std::io;
use std::path::Path;

use crate::error::{LeechError, Result};
use crate::job::{JobId, JobRegistry, Source};
use crate::storage::JobWorkspace;
use crate::transport::Transport;

async fn remove_file_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LeechError::fs(path, e)),
    }
}

/// Clean up after job `job_id`. Safe to call more than once: a job that is
/// already gone from the registry only gets its workspace swept again.
///
/// Cleanup keeps going past individual file errors; the first one is
/// returned after the job has been removed from the registry.
pub async fn finalize(
    registry: &JobRegistry,
    root: &Path,
    transport: &dyn Transport,
    job_id: JobId,
) -> Result<()> {
    let workspace = JobWorkspace::for_job(root, job_id);
    let job = match registry.get(job_id) {
        Ok(job) => job,
        Err(LeechError::NotFound(_)) => return workspace.remove().await,
        Err(e) => return Err(e),
    };
    if !job.state.is_terminal() {
        return Err(LeechError::Active {
            id: job_id,
            state: job.state,
        });
    }

    if let Some(handle) = &job.transport {
        transport.release(job_id, handle).await;
    }

    let mut first_error: Option<LeechError> = None;
    for artifact in &job.artifacts {
        if let Err(e) = remove_file_if_present(artifact).await {
            tracing::warn!(job_id, "artifact cleanup failed: {}", e);
            first_error.get_or_insert(e);
        }
    }
    if let Err(e) = workspace.remove().await {
        tracing::warn!(job_id, "workspace cleanup failed: {}", e);
        first_error.get_or_insert(e);
    }
    // Uploaded descriptors are saved under the root; user-supplied paths elsewhere are left alone.
    if let Source::TorrentFile(path) = &job.source {
        if path.starts_with(root) {
            if let Err(e) = remove_file_if_present(path).await {
                tracing::warn!(job_id, "torrent descriptor cleanup failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    match registry.remove(job_id) {
        Ok(_) | Err(LeechError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    tracing::info!(job_id, state = %job.state, "job finalized");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
