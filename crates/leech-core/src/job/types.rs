//! Job record and its component types.

use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use super::state::JobState;
use crate::error::LeechError;

/// Opaque job identifier, unique for the lifetime of the process.
pub type JobId = u64;

/// Identity of the requester (chat user id).
pub type OwnerId = i64;

/// What the job downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    DirectUrl(String),
    Magnet(String),
    /// Local path of an uploaded `.torrent` descriptor.
    TorrentFile(PathBuf),
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::DirectUrl(_) => "direct_url",
            Source::Magnet(_) => "magnet",
            Source::TorrentFile(_) => "torrent_file",
        }
    }

    /// True for sources handled by the download daemon.
    pub fn is_delegated(&self) -> bool {
        !matches!(self, Source::DirectUrl(_))
    }
}

/// Exclusive handle on the transport doing the work. At most one kind is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportHandle {
    /// Final path of a direct download (the `.part` sibling is the file in flight).
    Local(PathBuf),
    /// Daemon job id (`gid`).
    Daemon(String),
}

impl TransportHandle {
    pub fn same_kind(&self, other: &TransportHandle) -> bool {
        matches!(
            (self, other),
            (TransportHandle::Local(_), TransportHandle::Local(_))
                | (TransportHandle::Daemon(_), TransportHandle::Daemon(_))
        )
    }
}

/// Progress telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub bytes_total: Option<u64>,
    pub bytes_transferred: u64,
    /// Bytes per second.
    pub speed: u64,
    pub eta_seconds: Option<u64>,
}

impl Progress {
    /// Percent complete in [0, 100], if the total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.bytes_total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_transferred as f64 / total as f64 * 100.0).min(100.0)),
            None => None,
        }
    }
}

/// The unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub owner: OwnerId,
    pub source: Source,
    pub state: JobState,
    pub transport: Option<TransportHandle>,
    pub progress: Progress,
    /// Set only when `state == Failed`.
    pub error: Option<LeechError>,
    /// Completed local files, ascending path order.
    pub artifacts: Vec<PathBuf>,
    /// Every state the job has been in, oldest first.
    pub history: Vec<JobState>,
    pub created_at: SystemTime,
    pub last_progress_edit_at: Option<Instant>,
}

impl Job {
    pub(super) fn new(id: JobId, owner: OwnerId, source: Source) -> Self {
        Self {
            id,
            owner,
            source,
            state: JobState::Queued,
            transport: None,
            progress: Progress::default(),
            error: None,
            artifacts: Vec::new(),
            history: vec![JobState::Queued],
            created_at: SystemTime::now(),
            last_progress_edit_at: None,
        }
    }
}

/// Optional fields applied together with a state transition.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub bytes_total: Option<u64>,
    pub artifacts: Option<Vec<PathBuf>>,
    /// Recorded only on a transition to `Failed`.
    pub error: Option<LeechError>,
}

impl JobUpdate {
    pub fn total(bytes: Option<u64>) -> Self {
        Self {
            bytes_total: bytes,
            ..Self::default()
        }
    }

    pub fn artifacts(paths: Vec<PathBuf>) -> Self {
        Self {
            artifacts: Some(paths),
            ..Self::default()
        }
    }

    pub fn error(err: LeechError) -> Self {
        Self {
            error: Some(err),
            ..Self::default()
        }
    }
}
