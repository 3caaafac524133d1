//! Download transports.
//!
//! Two implementations sit behind [`Transport`]: the in-process
//! [`DirectTransport`] (curl GET to a `.part` file, atomic rename) and the
//! [`DelegatedTransport`] that hands magnets and torrent descriptors to an
//! external daemon over JSON-RPC and polls it. Both report progress as
//! [`ProgressSample`]s on a bounded channel and drive the job's registry
//! state up to `Downloading`; the caller moves it on to `Downloaded`.

pub mod daemon;
mod delegated;
pub mod direct;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::control::AbortToken;
use crate::error::Result;
use crate::job::{JobId, JobRegistry, Source, TransportHandle};
use crate::storage::JobWorkspace;

pub use delegated::{DelegatedOptions, DelegatedTransport};
pub use direct::{DirectOptions, DirectTransport, FetchError};

/// One byte-count observation from a running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub bytes_transferred: u64,
    pub bytes_total: Option<u64>,
    /// Bytes per second over the last sampling window.
    pub speed: u64,
}

/// Sender side of a job's progress stream. Transports use `try_send`, so a
/// slow consumer drops samples instead of stalling the transfer.
pub type ProgressTx = mpsc::Sender<ProgressSample>;

/// Everything a transport needs to run one job.
pub struct TransferContext<'a> {
    pub job_id: JobId,
    pub source: &'a Source,
    pub workspace: &'a JobWorkspace,
    pub registry: &'a JobRegistry,
    pub abort: &'a AbortToken,
    pub progress: ProgressTx,
}

/// The common download capability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the source into the job workspace and return the artifacts in
    /// ascending path order. Leaves the job in `Downloading` on success.
    async fn download(&self, ctx: TransferContext<'_>) -> Result<Vec<PathBuf>>;

    /// Best-effort release of an external handle; failures are logged only.
    async fn release(&self, job_id: JobId, handle: &TransportHandle);
}
