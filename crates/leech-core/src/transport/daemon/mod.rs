//! Client side of the external download daemon (aria2 JSON-RPC).
//!
//! [`DaemonRpc`] is the seam the delegated transport and the finalizer talk
//! to; [`Aria2Client`] is the production implementation. Status values are
//! decoded into [`DaemonJobStatus`], with aria2's string-encoded numbers
//! already parsed.

mod aria2;
mod protocol;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use aria2::Aria2Client;

use crate::error::LeechError;
use crate::retry::ErrorKind;

/// Failure of one RPC round-trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaemonError {
    /// Connection refused, timed out, or the transport failed mid-call.
    #[error("daemon unreachable: {0}")]
    Unreachable(String),
    /// The daemon answered with a JSON-RPC error object.
    #[error("daemon error {code}: {message}")]
    Fault { code: i64, message: String },
    /// The answer could not be understood.
    #[error("malformed daemon response: {0}")]
    Protocol(String),
}

impl DaemonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::Unreachable(_) => ErrorKind::Connection,
            DaemonError::Fault { .. } | DaemonError::Protocol(_) => ErrorKind::Other,
        }
    }
}

impl From<DaemonError> for LeechError {
    fn from(e: DaemonError) -> Self {
        LeechError::Rpc(e.to_string())
    }
}

/// Daemon-side lifecycle of one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl DaemonStatus {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "active" => DaemonStatus::Active,
            "waiting" => DaemonStatus::Waiting,
            "paused" => DaemonStatus::Paused,
            "error" => DaemonStatus::Error,
            "complete" => DaemonStatus::Complete,
            "removed" => DaemonStatus::Removed,
            _ => return None,
        })
    }
}

/// One file of a daemon download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonFile {
    pub path: PathBuf,
    pub length: u64,
    pub selected: bool,
}

/// Decoded `tellStatus` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonJobStatus {
    pub gid: String,
    pub status: DaemonStatus,
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    pub speed: u64,
    pub files: Vec<DaemonFile>,
    /// Gids spawned by this one (magnet metadata → real content).
    pub followed_by: Vec<String>,
    pub error_message: Option<String>,
}

impl DaemonJobStatus {
    /// Selected, named files in ascending path order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|f| f.selected && !f.path.as_os_str().is_empty())
            .map(|f| f.path.clone())
            .collect();
        out.sort();
        out
    }

    /// Total size if the daemon knows it (0 means "not yet").
    pub fn known_total(&self) -> Option<u64> {
        (self.bytes_total > 0).then_some(self.bytes_total)
    }
}

/// RPC operations the core needs from the daemon.
#[async_trait]
pub trait DaemonRpc: Send + Sync {
    /// Submit a URI (magnet link) to be saved under `dir`; returns the gid.
    async fn add_uri(&self, uri: &str, dir: &Path) -> Result<String, DaemonError>;

    /// Submit a torrent descriptor's raw bytes; returns the gid.
    async fn add_torrent(&self, torrent: &[u8], dir: &Path) -> Result<String, DaemonError>;

    async fn tell_status(&self, gid: &str) -> Result<DaemonJobStatus, DaemonError>;

    /// Stop a download (force; no tracker announce wait).
    async fn remove(&self, gid: &str) -> Result<(), DaemonError>;

    /// Forget a finished/removed download's result.
    async fn remove_download_result(&self, gid: &str) -> Result<(), DaemonError>;

    /// Connectivity check; returns the daemon version.
    async fn get_version(&self) -> Result<String, DaemonError>;
}
