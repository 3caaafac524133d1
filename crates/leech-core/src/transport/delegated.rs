//! Delegated Transport: magnets and torrent descriptors run inside the
//! external daemon; this side submits, polls, and maps daemon status onto
//! the job state machine.
//!
//! Each job owns its own poll loop, so a daemon that stops answering for one
//! job never delays polling of another.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::daemon::{DaemonError, DaemonJobStatus, DaemonRpc, DaemonStatus};
use super::{ProgressSample, TransferContext, Transport};
use crate::config::LeechConfig;
use crate::control::AbortToken;
use crate::error::{LeechError, Result};
use crate::job::{JobId, JobRegistry, JobState, JobUpdate, Source, TransportHandle};
use crate::retry::{run_with_retry, RetryPolicy};

#[derive(Debug, Clone)]
pub struct DelegatedOptions {
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl From<&LeechConfig> for DelegatedOptions {
    fn from(cfg: &LeechConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            retry: RetryPolicy::from(&cfg.retry_config()),
        }
    }
}

pub struct DelegatedTransport {
    daemon: Arc<dyn DaemonRpc>,
    opts: DelegatedOptions,
}

impl DelegatedTransport {
    pub fn new(daemon: Arc<dyn DaemonRpc>, opts: DelegatedOptions) -> Self {
        Self { daemon, opts }
    }

    /// Hand the source to the daemon; returns the gid.
    async fn submit(&self, source: &Source, dir: &Path, abort: &AbortToken) -> Result<String> {
        let daemon = &self.daemon;
        let gid = match source {
            Source::Magnet(uri) => {
                run_with_retry(&self.opts.retry, Some(abort), DaemonError::kind, move |_| {
                    daemon.add_uri(uri, dir)
                })
                .await?
            }
            Source::TorrentFile(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| LeechError::fs(path, e))?;
                let bytes = bytes.as_slice();
                run_with_retry(&self.opts.retry, Some(abort), DaemonError::kind, move |_| {
                    daemon.add_torrent(bytes, dir)
                })
                .await?
            }
            Source::DirectUrl(_) => {
                return Err(LeechError::Source(
                    "direct URLs are not handed to the daemon".to_string(),
                ))
            }
        };
        Ok(gid)
    }

    /// One status poll with the retry budget; exhaustion is an `RPCError`.
    async fn poll(&self, gid: &str, abort: &AbortToken) -> Result<DaemonJobStatus> {
        let daemon = &self.daemon;
        run_with_retry(&self.opts.retry, Some(abort), DaemonError::kind, move |_| {
            daemon.tell_status(gid)
        })
        .await
        .map_err(|e| {
            if abort.is_aborted() {
                LeechError::Cancelled
            } else {
                LeechError::Rpc(format!("status poll for {} failed: {}", gid, e))
            }
        })
    }

    /// Record `gid` as the job's transport handle. If the job can no longer
    /// take it (cancelled meanwhile), the daemon download is dropped at once.
    async fn adopt(&self, ctx: &TransferContext<'_>, gid: &str) -> Result<()> {
        let handle = TransportHandle::Daemon(gid.to_string());
        if let Err(e) = ctx.registry.attach_transport(ctx.job_id, handle.clone()) {
            self.release(ctx.job_id, &handle).await;
            return Err(e);
        }
        Ok(())
    }

    /// Poll until the daemon reports a terminal status.
    async fn watch(&self, ctx: &TransferContext<'_>, first_gid: String) -> Result<Vec<PathBuf>> {
        let mut gid = first_gid;
        let mut downloading = false;
        loop {
            tokio::time::sleep(self.opts.poll_interval).await;
            if ctx.abort.is_aborted() {
                return Err(LeechError::Cancelled);
            }
            let status = self.poll(&gid, ctx.abort).await?;
            tracing::trace!(
                job_id = ctx.job_id,
                gid = %gid,
                status = ?status.status,
                done = status.bytes_transferred,
                total = status.bytes_total,
                "daemon status"
            );

            match status.status {
                DaemonStatus::Active | DaemonStatus::Waiting | DaemonStatus::Paused => {
                    if status.status == DaemonStatus::Active && !downloading {
                        enter_downloading(ctx.registry, ctx.job_id, &status)?;
                        downloading = true;
                    }
                    if downloading {
                        send_sample(ctx, &status);
                    }
                }
                DaemonStatus::Complete => {
                    if let Some(next) = status.followed_by.first() {
                        tracing::info!(job_id = ctx.job_id, from = %gid, to = %next, "following daemon hand-off");
                        let previous = std::mem::replace(&mut gid, next.clone());
                        self.adopt(ctx, &gid).await?;
                        if let Err(e) = self.daemon.remove_download_result(&previous).await {
                            tracing::debug!(job_id = ctx.job_id, gid = %previous, "dropping metadata result: {}", e);
                        }
                        continue;
                    }
                    if !downloading {
                        enter_downloading(ctx.registry, ctx.job_id, &status)?;
                    }
                    send_sample(ctx, &status);
                    let artifacts = status.artifacts();
                    if artifacts.is_empty() {
                        return Err(LeechError::Rpc(format!(
                            "download {} completed without any files",
                            gid
                        )));
                    }
                    return Ok(artifacts);
                }
                DaemonStatus::Error => {
                    let reason = status
                        .error_message
                        .unwrap_or_else(|| "download failed".to_string());
                    return Err(LeechError::Rpc(reason));
                }
                DaemonStatus::Removed => return Err(LeechError::Cancelled),
            }
        }
    }
}

fn enter_downloading(registry: &JobRegistry, id: JobId, status: &DaemonJobStatus) -> Result<()> {
    registry.transition(id, JobState::Downloading, JobUpdate::total(status.known_total()))
}

fn send_sample(ctx: &TransferContext<'_>, status: &DaemonJobStatus) {
    let _ = ctx.progress.try_send(ProgressSample {
        bytes_transferred: status.bytes_transferred,
        bytes_total: status.known_total(),
        speed: status.speed,
    });
}

#[async_trait]
impl Transport for DelegatedTransport {
    async fn download(&self, ctx: TransferContext<'_>) -> Result<Vec<PathBuf>> {
        // The daemon may not share our working directory.
        let dir = tokio::fs::canonicalize(ctx.workspace.dir())
            .await
            .unwrap_or_else(|_| ctx.workspace.dir().to_path_buf());

        let gid = self.submit(ctx.source, &dir, ctx.abort).await?;
        tracing::info!(job_id = ctx.job_id, gid = %gid, "submitted to download daemon");
        self.adopt(&ctx, &gid).await?;
        self.watch(&ctx, gid).await
    }

    async fn release(&self, job_id: JobId, handle: &TransportHandle) {
        let TransportHandle::Daemon(gid) = handle else {
            return;
        };
        if let Err(e) = self.daemon.remove(gid).await {
            // Already complete or removed downloads answer with a fault.
            tracing::debug!(job_id, gid = %gid, "daemon remove: {}", e);
        }
        if let Err(e) = self.daemon.remove_download_result(gid).await {
            tracing::debug!(job_id, gid = %gid, "daemon removeDownloadResult: {}", e);
        }
    }
}
