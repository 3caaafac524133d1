//! Direct Transport: streamed HTTP(S)/FTP fetch into the job workspace.
//!
//! HEAD probe (size, filename) → size and free-space checks → GET into
//! `<name>.part` with retry → atomic rename to `<name>`. Nothing ever
//! appears under the final name unless the whole body arrived.

mod error;
mod fetch;
mod probe;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

pub use error::FetchError;
pub use probe::HeadInfo;

use self::fetch::FetchRequest;
use super::{ProgressTx, TransferContext, Transport};
use crate::config::LeechConfig;
use crate::control::AbortToken;
use crate::error::{LeechError, Result};
use crate::job::{JobId, JobState, JobUpdate, Source, TransportHandle};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::storage::{ensure_space, temp_path, StorageWriterBuilder};
use crate::url_model::derive_filename;

/// Tunables of the direct transport.
#[derive(Debug, Clone)]
pub struct DirectOptions {
    pub max_size: u64,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub sample_interval: Duration,
    pub retry: RetryPolicy,
}

impl From<&LeechConfig> for DirectOptions {
    fn from(cfg: &LeechConfig) -> Self {
        Self {
            max_size: cfg.max_artifact_size,
            connect_timeout: Duration::from_secs(cfg.http.connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.http.idle_timeout_secs),
            sample_interval: cfg.progress_sample_interval(),
            retry: RetryPolicy::from(&cfg.retry_config()),
        }
    }
}

pub struct DirectTransport {
    opts: DirectOptions,
}

impl DirectTransport {
    pub fn new(opts: DirectOptions) -> Self {
        Self { opts }
    }

    async fn probe(&self, url: &str, abort: &AbortToken) -> Result<HeadInfo, FetchError> {
        let timeout = self.opts.connect_timeout;
        run_with_retry(&self.opts.retry, Some(abort), FetchError::kind, |_| {
            let url = url.to_string();
            async move {
                tokio::task::spawn_blocking(move || probe::probe(&url, timeout))
                    .await
                    .map_err(|e| FetchError::Task(e.to_string()))?
            }
        })
        .await
    }

    async fn fetch(
        &self,
        job_id: JobId,
        req: FetchRequest,
        final_path: &Path,
        abort: &AbortToken,
        progress: &ProgressTx,
    ) -> Result<u64, FetchError> {
        let temp = temp_path(final_path);
        run_with_retry(&self.opts.retry, Some(abort), FetchError::kind, |attempt| {
            let req = req.clone();
            let temp = temp.clone();
            let final_path = final_path.to_path_buf();
            let abort = abort.clone();
            let progress = progress.clone();
            async move {
                if attempt > 1 {
                    tracing::info!(job_id, attempt, url = %req.url, "retrying direct fetch");
                }
                tokio::task::spawn_blocking(move || {
                    attempt_once(&req, &temp, &final_path, &abort, &progress)
                })
                .await
                .map_err(|e| FetchError::Task(e.to_string()))?
            }
        })
        .await
    }
}

/// One GET attempt: fresh temp file, transfer, then rename or discard.
fn attempt_once(
    req: &FetchRequest,
    temp: &Path,
    final_path: &Path,
    abort: &AbortToken,
    progress: &ProgressTx,
) -> Result<u64, FetchError> {
    let mut builder = StorageWriterBuilder::create(temp).map_err(FetchError::Storage)?;
    if let Some(len) = req.expected_len {
        builder.preallocate(len).map_err(FetchError::Storage)?;
    }
    let storage = builder.build();

    match fetch::fetch_to(req, &storage, abort, progress) {
        Ok(written) => {
            let done = storage
                .truncate(written)
                .and_then(|()| storage.sync())
                .map_err(FetchError::Storage);
            match done {
                Ok(()) => {
                    storage.finalize(final_path).map_err(FetchError::Storage)?;
                    Ok(written)
                }
                Err(e) => {
                    storage.discard();
                    Err(e)
                }
            }
        }
        Err(e) => {
            storage.discard();
            Err(e)
        }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn download(&self, ctx: TransferContext<'_>) -> Result<Vec<PathBuf>> {
        let Source::DirectUrl(url) = ctx.source else {
            return Err(LeechError::Source(format!(
                "direct transport cannot fetch a {} source",
                ctx.source.kind()
            )));
        };

        let head = self.probe(url, ctx.abort).await.map_err(LeechError::from)?;
        if ctx.abort.is_aborted() {
            return Err(LeechError::Cancelled);
        }
        let advertised = if head.usable() {
            head.content_length
        } else {
            tracing::debug!(job_id = ctx.job_id, status = ?head.status, "HEAD failed; size unknown");
            None
        };
        if let Some(len) = advertised {
            if len > self.opts.max_size {
                return Err(LeechError::Capacity(format!(
                    "file is {} bytes; the limit is {}",
                    len, self.opts.max_size
                )));
            }
            ensure_space(ctx.workspace.dir(), len)?;
        }

        let name_url = head.effective_url.as_deref().unwrap_or(url);
        let disposition = if head.usable() {
            head.content_disposition.as_deref()
        } else {
            None
        };
        let final_path = ctx.workspace.dir().join(derive_filename(name_url, disposition));

        ctx.registry
            .attach_transport(ctx.job_id, TransportHandle::Local(final_path.clone()))?;
        ctx.registry
            .transition(ctx.job_id, JobState::Downloading, JobUpdate::total(advertised))?;
        tracing::info!(
            job_id = ctx.job_id,
            path = %final_path.display(),
            size = ?advertised,
            "direct download started"
        );

        let req = FetchRequest {
            url: url.clone(),
            expected_len: advertised,
            max_size: self.opts.max_size,
            connect_timeout: self.opts.connect_timeout,
            idle_timeout: self.opts.idle_timeout,
            sample_interval: self.opts.sample_interval,
        };
        let written = self
            .fetch(ctx.job_id, req, &final_path, ctx.abort, &ctx.progress)
            .await
            .map_err(LeechError::from)?;

        tracing::info!(job_id = ctx.job_id, bytes = written, "direct download finished");
        Ok(vec![final_path])
    }

    async fn release(&self, _job_id: JobId, _handle: &TransportHandle) {
        // Local files belong to the job workspace; the finalizer removes them.
    }
}
