//! Service facade.
//!
//! [`Leech`] owns the registry, both transports and the messaging endpoint,
//! and runs one task per admitted job:
//! workspace → transport (with progress pump) → upload → finalizer.
//! Admission errors (unrecognized source, capacity) are returned from
//! [`Leech::submit`] before any task is spawned.

mod guard;
mod run;
mod stats;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::LeechConfig;
use crate::control::JobControl;
use crate::error::{LeechError, Result};
use crate::job::{Job, JobId, JobRegistry, JobState, Limits, OwnerId, Source};
use crate::messaging::{ChatId, MessagingEndpoint};
use crate::progress::{CANCELLED_TEXT, STARTING_TEXT};
use crate::source;
use crate::transport::daemon::DaemonRpc;
use crate::transport::{
    DelegatedOptions, DelegatedTransport, DirectOptions, DirectTransport, Transport,
};
use crate::upload::UploadReport;

pub use stats::{dir_usage, LeechStats};

/// One leech request as received from the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeechRequest {
    pub owner: OwnerId,
    /// Where status text and artifacts go.
    pub chat: ChatId,
    /// Magnet URI, torrent descriptor path, or absolute URL.
    pub reference: String,
}

/// Outcome of a job task, available once the job has been finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: JobId,
    /// Terminal state the job ended in.
    pub state: JobState,
    pub report: Option<UploadReport>,
    pub error: Option<LeechError>,
}

impl JobSummary {
    /// Final text of the job's status message.
    pub fn text(&self) -> String {
        match (&self.report, &self.error) {
            (_, Some(err)) => format!("❌ Error: {}", err),
            (Some(report), None) => report.summary(),
            (None, None) if self.state == JobState::Cancelled => CANCELLED_TEXT.to_string(),
            (None, None) => format!("Job {} ended {}", self.job_id, self.state),
        }
    }
}

struct Inner {
    cfg: LeechConfig,
    registry: Arc<JobRegistry>,
    control: JobControl,
    direct: DirectTransport,
    delegated: DelegatedTransport,
    daemon: Arc<dyn DaemonRpc>,
    endpoint: Arc<dyn MessagingEndpoint>,
}

/// Cheap to clone; every clone drives the same registry.
#[derive(Clone)]
pub struct Leech {
    inner: Arc<Inner>,
}

impl Leech {
    pub fn new(
        cfg: LeechConfig,
        daemon: Arc<dyn DaemonRpc>,
        endpoint: Arc<dyn MessagingEndpoint>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new(Limits::from(&cfg)));
        let direct = DirectTransport::new(DirectOptions::from(&cfg));
        let delegated = DelegatedTransport::new(Arc::clone(&daemon), DelegatedOptions::from(&cfg));
        Self {
            inner: Arc::new(Inner {
                cfg,
                registry,
                control: JobControl::new(),
                direct,
                delegated,
                daemon,
                endpoint,
            }),
        }
    }

    pub fn config(&self) -> &LeechConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.inner.registry
    }

    fn transport_for(&self, source: &Source) -> &dyn Transport {
        if source.is_delegated() {
            &self.inner.delegated
        } else {
            &self.inner.direct
        }
    }

    /// Admit a request and start its job task.
    ///
    /// Returns the job id and a handle resolving to the job's summary once it
    /// is finalized. Fails with `Source` or `Capacity` without creating a task.
    pub async fn submit(&self, request: LeechRequest) -> Result<(JobId, JoinHandle<JobSummary>)> {
        let source = source::classify(&request.reference)?;
        self.submit_source(request.owner, request.chat, source).await
    }

    /// Admit an already classified source. Fails with `Capacity` without
    /// creating a task.
    pub async fn submit_source(
        &self,
        owner: OwnerId,
        chat: ChatId,
        source: Source,
    ) -> Result<(JobId, JoinHandle<JobSummary>)> {
        let job = self.inner.registry.create(owner, source)?;
        let abort = self.inner.control.register(job.id);
        tracing::info!(
            job_id = job.id,
            owner,
            source = job.source.kind(),
            "job admitted"
        );

        let status = match self.inner.endpoint.send_text(chat, STARTING_TEXT).await {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(job_id = job.id, "status message not sent, running without progress: {}", e);
                None
            }
        };

        let job_id = job.id;
        let leech = self.clone();
        let handle = tokio::spawn(async move { leech.run_job(job, chat, abort, status).await });
        Ok((job_id, handle))
    }

    /// Cancel one of `owner`'s jobs. The registry moves to `Cancelled` right
    /// away; the job task notices at its next suspension point and finalizes.
    /// Returns the state the job was in.
    pub fn cancel(&self, job_id: JobId, owner: OwnerId) -> Result<JobState> {
        let job = self.inner.registry.get(job_id)?;
        if job.owner != owner {
            return Err(LeechError::NotFound(job_id));
        }
        let from = self.inner.registry.cancel(job_id)?;
        if !self.inner.control.request_abort(job_id) {
            tracing::debug!(job_id, "cancel: no running task");
        }
        Ok(from)
    }

    /// Cancel everything still running (shutdown).
    pub fn cancel_all(&self) {
        for job_id in self.inner.registry.active_ids() {
            let _ = self.inner.registry.cancel(job_id);
        }
        self.inner.control.abort_all();
    }

    /// Snapshots of `owner`'s jobs, oldest first.
    pub fn jobs_for(&self, owner: OwnerId) -> Vec<Job> {
        self.inner.registry.list_by_owner(owner)
    }

    /// Active jobs plus usage of the download root.
    pub async fn stats(&self) -> Result<LeechStats> {
        let root = self.inner.cfg.download_dir.clone();
        let active_jobs = self.inner.registry.active_count();
        let usage = tokio::task::spawn_blocking(move || stats::collect(&root))
            .await
            .map_err(|e| LeechError::FileSystem(format!("stats task: {}", e)))??;
        Ok(LeechStats {
            active_jobs,
            ..usage
        })
    }

    /// Ask the download daemon for its version.
    pub async fn check_daemon(&self) -> Result<String> {
        self.inner.daemon.get_version().await.map_err(LeechError::from)
    }
}
