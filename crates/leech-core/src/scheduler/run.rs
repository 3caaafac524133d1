//! One job task: download, upload, settle the terminal state, finalize.

use tokio::sync::mpsc;

use super::guard::ControlGuard;
use super::{JobSummary, Leech};
use crate::control::AbortToken;
use crate::error::{LeechError, Result};
use crate::finalize::finalize;
use crate::job::{Job, JobId, JobState, JobUpdate};
use crate::messaging::{ChatId, MessageRef};
use crate::progress::{pump, ProgressReporter, DOWNLOAD_COMPLETE_TEXT};
use crate::storage::JobWorkspace;
use crate::transport::TransferContext;
use crate::upload::{upload_artifacts, UploadOptions, UploadReport};

/// Bounded so a stalled status edit makes transports drop samples, not block.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

impl Leech {
    pub(super) async fn run_job(
        &self,
        job: Job,
        chat: ChatId,
        abort: AbortToken,
        status: Option<MessageRef>,
    ) -> JobSummary {
        let inner = &self.inner;
        let _guard = ControlGuard {
            control: &inner.control,
            job_id: job.id,
        };
        let mut reporter = ProgressReporter::new(
            job.id,
            inner.endpoint.clone(),
            status,
            inner.cfg.progress_edit_interval(),
        );

        let outcome = self.drive(&job, chat, &abort, &mut reporter).await;
        let summary = self.settle(job.id, &abort, outcome);
        match &summary.error {
            Some(err) => tracing::warn!(job_id = job.id, kind = err.kind(), "job failed: {}", err),
            None => tracing::info!(job_id = job.id, state = %summary.state, "job finished"),
        }
        reporter.set_status(&summary.text()).await;

        let transport = self.transport_for(&job.source);
        if let Err(e) = finalize(&inner.registry, &inner.cfg.download_dir, transport, job.id).await {
            tracing::warn!(job_id = job.id, "finalize: {}", e);
        }
        summary
    }

    async fn drive(
        &self,
        job: &Job,
        chat: ChatId,
        abort: &AbortToken,
        reporter: &mut ProgressReporter,
    ) -> Result<UploadReport> {
        let inner = &self.inner;
        let registry = inner.registry.as_ref();

        registry.transition(job.id, JobState::Resolving, JobUpdate::default())?;
        let workspace = JobWorkspace::create(&inner.cfg.download_dir, job.id).await?;

        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let ctx = TransferContext {
            job_id: job.id,
            source: &job.source,
            workspace: &workspace,
            registry,
            abort,
            progress: tx,
        };
        // The transfer owns the only sender, so the pump drains once it returns.
        let (downloaded, ()) = tokio::join!(
            self.transport_for(&job.source).download(ctx),
            pump(job.id, registry, rx, reporter),
        );
        let artifacts = downloaded?;

        registry.transition(
            job.id,
            JobState::Downloaded,
            JobUpdate::artifacts(artifacts.clone()),
        )?;
        tracing::info!(job_id = job.id, artifacts = artifacts.len(), "download complete");
        reporter.set_status(DOWNLOAD_COMPLETE_TEXT).await;

        registry.transition(job.id, JobState::Classifying, JobUpdate::default())?;
        registry.transition(job.id, JobState::Uploading, JobUpdate::default())?;
        let report = upload_artifacts(
            inner.endpoint.as_ref(),
            chat,
            &artifacts,
            &UploadOptions::from(&inner.cfg),
            abort,
            reporter,
        )
        .await?;

        registry.transition(job.id, JobState::Done, JobUpdate::default())?;
        Ok(report)
    }

    /// Move the job to its terminal state and build the summary. A job
    /// cancelled while a stage was running ends `Cancelled` whatever error
    /// that stage returned.
    fn settle(&self, job_id: JobId, abort: &AbortToken, outcome: Result<UploadReport>) -> JobSummary {
        let registry = self.inner.registry.as_ref();
        let mut summary = JobSummary {
            job_id,
            state: JobState::Done,
            report: None,
            error: None,
        };
        let err = match outcome {
            Ok(report) => {
                summary.report = Some(report);
                return summary;
            }
            Err(err) => err,
        };

        let current = |fallback: JobState| {
            registry
                .get(job_id)
                .map(|j| j.state)
                .unwrap_or(fallback)
        };
        let state = match registry.get(job_id) {
            Ok(job) => job.state,
            Err(e) => {
                tracing::warn!(job_id, "job vanished before settling: {}", e);
                JobState::Failed
            }
        };
        summary.state = if state.is_terminal() {
            state
        } else if abort.is_aborted() || err == LeechError::Cancelled {
            match registry.cancel(job_id) {
                Ok(_) => JobState::Cancelled,
                Err(e) => {
                    tracing::debug!(job_id, "cancel after abort: {}", e);
                    current(JobState::Cancelled)
                }
            }
        } else {
            match registry.fail(job_id, err.clone()) {
                Ok(()) => JobState::Failed,
                // Lost a race with a cancel request.
                Err(_) => current(JobState::Failed),
            }
        };
        if summary.state == JobState::Failed {
            summary.error = Some(err);
        }
        summary
    }
}
