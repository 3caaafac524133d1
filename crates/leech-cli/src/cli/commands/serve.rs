//! `leech serve` – long-poll the Bot API and dispatch messages until Ctrl-C.

use std::time::Duration;

use anyhow::Result;
use leech_core::config::LeechConfig;

use super::build_service;
use crate::cli::bot::Dispatcher;

/// Pause after a failed getUpdates before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);
/// How long shutdown waits for cancelled jobs to finalize.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

pub async fn run_serve(cfg: LeechConfig) -> Result<()> {
    cfg.validate_for_bot()?;
    let (leech, bot) = build_service(&cfg);

    match leech.check_daemon().await {
        Ok(version) => tracing::info!(version = %version, "download daemon reachable"),
        Err(e) => tracing::warn!(
            "download daemon not reachable ({}); magnets and torrents will fail until it is",
            e
        ),
    }

    let dispatcher = Dispatcher::new(leech.clone(), bot.clone());
    let mut offset = 0i64;
    println!("Bot is running. Press Ctrl-C to stop.");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            polled = bot.get_updates(offset) => match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            dispatcher.handle(message).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            },
        }
    }

    tracing::info!("shutting down; cancelling running jobs");
    leech.cancel_all();
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while !leech.registry().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if !leech.registry().is_empty() {
        tracing::warn!(jobs = leech.registry().len(), "jobs still finalizing at exit");
    }
    Ok(())
}
