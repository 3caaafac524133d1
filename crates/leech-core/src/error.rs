//! Error taxonomy shared by every stage of a job.
//!
//! Component-local errors (`FetchError`, `DaemonError`, `SendError`) carry
//! enough detail for retry classification; they are mapped into `LeechError`
//! once a stage gives up, and that value is what the job record keeps.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::job::{JobId, JobState};

/// Result alias used throughout the core.
pub type Result<T, E = LeechError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeechError {
    /// The reference is not a magnet, torrent descriptor, or absolute URL.
    #[error("unrecognized source: {0}")]
    Source(String),

    /// Transport-level failure on a direct fetch (after retries).
    #[error("network error: {message}")]
    Network {
        message: String,
        /// HTTP status when the server answered with a non-success code.
        status: Option<u32>,
    },

    /// The download daemon was unreachable or reported an error.
    #[error("download daemon error: {0}")]
    Rpc(String),

    /// A size or concurrency ceiling was hit.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// The messaging endpoint rejected or failed to accept a file.
    #[error("upload of {file} failed: {message}")]
    Upload { file: String, message: String },

    /// Local disk failure (I/O error, no space left).
    #[error("file system error: {0}")]
    FileSystem(String),

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {id}: cannot move from {from} to {to}")]
    InvalidState {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    /// Removal requested while the job is still in a non-terminal state.
    #[error("job {id} is still {state}")]
    Active { id: JobId, state: JobState },

    /// The job was cancelled and the stage stopped at its next suspension point.
    #[error("job cancelled")]
    Cancelled,
}

impl LeechError {
    /// Short machine-readable name of the error class (used in logs and summaries).
    pub fn kind(&self) -> &'static str {
        match self {
            LeechError::Source(_) => "source",
            LeechError::Network { .. } => "network",
            LeechError::Rpc(_) => "rpc",
            LeechError::Capacity(_) => "capacity",
            LeechError::Upload { .. } => "upload",
            LeechError::FileSystem(_) => "filesystem",
            LeechError::NotFound(_) => "not_found",
            LeechError::InvalidState { .. } => "invalid_state",
            LeechError::Active { .. } => "active",
            LeechError::Cancelled => "cancelled",
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn fs(path: &Path, err: io::Error) -> Self {
        LeechError::FileSystem(format!("{}: {}", path.display(), err))
    }

    /// Errors rejected before any transport work starts; reported straight back to the requester.
    pub fn is_admission(&self) -> bool {
        matches!(self, LeechError::Source(_) | LeechError::Capacity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_mentions_path() {
        let err = LeechError::fs(
            Path::new("/tmp/leech/job-1"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "filesystem");
        assert!(err.to_string().contains("/tmp/leech/job-1"));
    }

    #[test]
    fn admission_errors() {
        assert!(LeechError::Source("x".into()).is_admission());
        assert!(LeechError::Capacity("x".into()).is_admission());
        assert!(!LeechError::Rpc("x".into()).is_admission());
        assert!(!LeechError::Cancelled.is_admission());
    }
}
