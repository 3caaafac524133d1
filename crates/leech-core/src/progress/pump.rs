//! Sample consumer: registry bookkeeping plus throttled reporting.

use tokio::sync::mpsc;

use super::reporter::ProgressReporter;
use crate::job::{JobId, JobRegistry};
use crate::transport::ProgressSample;

/// Drain `samples` until every sender is dropped, recording each in the
/// registry and forwarding the merged telemetry to `reporter`.
///
/// Meant to be joined with the transfer that owns the sender, so the
/// registry holds the final byte counts once both complete.
pub async fn pump(
    job_id: JobId,
    registry: &JobRegistry,
    mut samples: mpsc::Receiver<ProgressSample>,
    reporter: &mut ProgressReporter,
) {
    while let Some(sample) = samples.recv().await {
        let progress = match registry.record_progress(
            job_id,
            sample.bytes_transferred,
            sample.bytes_total,
            sample.speed,
        ) {
            Ok(p) => p,
            Err(e) => {
                // Late samples after a state change are expected.
                tracing::trace!(job_id, "progress sample dropped: {}", e);
                continue;
            }
        };
        if reporter.report(&progress).await {
            let _ = registry.note_progress_edit(job_id);
        }
    }
}
