#![allow(dead_code)]

pub mod fakes;
pub mod http_server;
pub mod rpc_server;

use std::path::Path;
use std::time::Duration;

use leech_core::config::{LeechConfig, RetryConfig};
use leech_core::job::{JobEvent, JobId, JobRegistry, JobState};
use tokio::sync::broadcast;

/// Config for in-process runs: fast polling, no edit throttling, short backoff.
pub fn config(root: &Path, max_artifact_size: u64) -> LeechConfig {
    LeechConfig {
        download_dir: root.to_path_buf(),
        max_artifact_size,
        max_concurrent_jobs: 4,
        max_jobs_per_owner: 2,
        poll_interval_ms: 10,
        progress_edit_interval_ms: 0,
        progress_sample_interval_ms: 5,
        retry: Some(RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0.005,
            max_delay_secs: 1,
        }),
        ..LeechConfig::default()
    }
}

/// Every event published so far.
pub fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => out.push(ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return out,
        }
    }
}

/// States the job moved through, `Queued` first.
pub fn states_of(events: &[JobEvent], id: JobId) -> Vec<JobState> {
    let mut states = vec![JobState::Queued];
    for ev in events {
        if let JobEvent::Transitioned { id: j, to, .. } = ev {
            if *j == id {
                states.push(*to);
            }
        }
    }
    states
}

/// Byte counts of every progress event of the job, in publish order.
pub fn transferred_of(events: &[JobEvent], id: JobId) -> Vec<u64> {
    events
        .iter()
        .filter_map(|ev| match ev {
            JobEvent::Progress {
                id: j,
                bytes_transferred,
                ..
            } if *j == id => Some(*bytes_transferred),
            _ => None,
        })
        .collect()
}

/// Poll the registry until the job reaches `state` (panics after ~5s).
pub async fn wait_for_state(registry: &JobRegistry, id: JobId, state: JobState) {
    for _ in 0..1000 {
        if registry.get(id).map(|j| j.state == state).unwrap_or(false) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached {}", id, state);
}

/// Regular files left anywhere under `root`.
pub fn files_under(root: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
