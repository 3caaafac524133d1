//! Sequential artifact upload with per-file failure accounting.

use std::path::{Path, PathBuf};

use super::classify::detect_kind;
use crate::config::LeechConfig;
use crate::control::AbortToken;
use crate::error::{LeechError, Result};
use crate::messaging::{ChatId, MediaKind, MessageRef, MessagingEndpoint, SendError};
use crate::progress::{caption, format_bytes, ProgressReporter};
use crate::retry::{ErrorKind, RetryDecision, RetryPolicy};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Largest file sent; bigger artifacts are skipped.
    pub max_size: u64,
    pub retry: RetryPolicy,
}

impl From<&LeechConfig> for UploadOptions {
    fn from(cfg: &LeechConfig) -> Self {
        Self {
            max_size: cfg.max_artifact_size,
            retry: RetryPolicy::from(&cfg.retry_config()),
        }
    }
}

/// What happened to each artifact of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<(PathBuf, MediaKind)>,
    /// Per-file `Upload` errors, in upload order.
    pub failures: Vec<(PathBuf, LeechError)>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failures.len()
    }

    /// Completion text for the status message.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "✅ Upload completed!\n📦 Uploaded {} of {} file(s)",
            self.uploaded.len(),
            self.total()
        );
        for (path, err) in &self.failures {
            let reason = match err {
                LeechError::Upload { message, .. } => message.clone(),
                other => other.to_string(),
            };
            text.push_str(&format!("\n⚠️ {}: {}", display_name(path), reason));
        }
        text
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn upload_error(path: &Path, message: impl Into<String>) -> LeechError {
    LeechError::Upload {
        file: display_name(path),
        message: message.into(),
    }
}

/// Send one file, honouring rate limits and retrying transport failures
/// within the retry budget.
async fn send_with_retry(
    endpoint: &dyn MessagingEndpoint,
    chat: ChatId,
    kind: MediaKind,
    path: &Path,
    caption: &str,
    policy: &RetryPolicy,
    abort: &AbortToken,
) -> std::result::Result<MessageRef, SendError> {
    let mut attempt = 1u32;
    loop {
        let err = match endpoint.send_media(chat, kind, path, caption).await {
            Ok(m) => return Ok(m),
            Err(e) => e,
        };
        let delay = match &err {
            SendError::Throttled { retry_after } => match policy.decide(attempt, ErrorKind::Throttled) {
                // Endpoint hints are honoured up to the policy's ceiling.
                RetryDecision::RetryAfter(_) => (*retry_after).min(policy.max_delay),
                RetryDecision::NoRetry => return Err(err),
            },
            SendError::Transport(_) => match policy.decide(attempt, ErrorKind::Connection) {
                RetryDecision::RetryAfter(d) => d,
                RetryDecision::NoRetry => return Err(err),
            },
            SendError::Rejected { .. } | SendError::Gone(_) => return Err(err),
        };
        tracing::debug!(file = %path.display(), attempt, delay_ms = delay.as_millis() as u64, "upload retry: {}", err);
        tokio::time::sleep(delay).await;
        if abort.is_aborted() {
            return Err(err);
        }
        attempt += 1;
    }
}

/// Upload every artifact in ascending path order.
///
/// Oversized or rejected files are recorded as per-file `Upload` errors. The
/// call fails when the only artifact cannot be sent, when every artifact
/// failed (with the first failure), on a local file-system error, or when
/// `abort` is raised between files.
pub async fn upload_artifacts(
    endpoint: &dyn MessagingEndpoint,
    chat: ChatId,
    artifacts: &[PathBuf],
    opts: &UploadOptions,
    abort: &AbortToken,
    status: &mut ProgressReporter,
) -> Result<UploadReport> {
    let mut ordered = artifacts.to_vec();
    ordered.sort();
    let n = ordered.len();
    if n == 0 {
        return Err(LeechError::Upload {
            file: String::new(),
            message: "nothing to upload".to_string(),
        });
    }

    let mut report = UploadReport::default();
    for (i, path) in ordered.iter().enumerate() {
        if abort.is_aborted() {
            return Err(LeechError::Cancelled);
        }
        let name = display_name(path);
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| LeechError::fs(path, e))?
            .len();

        if size > opts.max_size {
            let err = upload_error(
                path,
                format!(
                    "file is too large ({}); the limit is {}",
                    format_bytes(size),
                    format_bytes(opts.max_size)
                ),
            );
            tracing::warn!(file = %name, size, "skipping oversized artifact");
            if n == 1 {
                return Err(err);
            }
            report.failures.push((path.clone(), err));
            continue;
        }

        if n > 1 {
            status
                .set_status(&format!("📤 Uploading {}/{}: {}", i + 1, n, name))
                .await;
        }

        let kind = detect_kind(path).await;
        let first = send_with_retry(
            endpoint,
            chat,
            kind,
            path,
            &caption(kind, &name, size),
            &opts.retry,
            abort,
        )
        .await;
        let outcome = match first {
            Err(SendError::Rejected { description, .. }) if kind != MediaKind::Document => {
                tracing::info!(file = %name, kind = kind.as_str(), "rejected ({}); retrying as document", description);
                send_with_retry(
                    endpoint,
                    chat,
                    MediaKind::Document,
                    path,
                    &caption(MediaKind::Document, &name, size),
                    &opts.retry,
                    abort,
                )
                .await
                .map(|_| MediaKind::Document)
            }
            other => other.map(|_| kind),
        };

        match outcome {
            Ok(sent_as) => {
                tracing::info!(file = %name, kind = sent_as.as_str(), size, "artifact uploaded");
                report.uploaded.push((path.clone(), sent_as));
            }
            Err(e) => {
                if abort.is_aborted() {
                    return Err(LeechError::Cancelled);
                }
                tracing::warn!(file = %name, "upload failed: {}", e);
                report.failures.push((path.clone(), upload_error(path, e.to_string())));
            }
        }
    }

    if report.uploaded.is_empty() {
        if let Some((_, first)) = report.failures.first() {
            return Err(first.clone());
        }
    }
    Ok(report)
}
