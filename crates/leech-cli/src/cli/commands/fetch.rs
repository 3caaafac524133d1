//! `leech fetch <reference> --chat <id>` – run one job and wait for its summary.

use anyhow::{bail, Context, Result};
use leech_core::config::LeechConfig;
use leech_core::job::JobState;
use leech_core::scheduler::LeechRequest;

use super::build_service;

pub async fn run_fetch(cfg: LeechConfig, reference: &str, chat: i64) -> Result<()> {
    cfg.validate_for_bot()?;
    let (leech, _bot) = build_service(&cfg);

    let request = LeechRequest {
        owner: chat,
        chat,
        reference: reference.to_string(),
    };
    let (job_id, mut handle) = leech.submit(request).await?;
    println!("Started job {job_id}");

    let summary = tokio::select! {
        joined = &mut handle => joined.context("job task join")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(job_id, "interrupted; cancelling");
            if let Err(e) = leech.cancel(job_id, chat) {
                tracing::debug!(job_id, "cancel: {}", e);
            }
            handle.await.context("job task join")?
        }
    };

    println!("{}", summary.text());
    if summary.state == JobState::Failed {
        bail!("job {} failed", job_id);
    }
    Ok(())
}
