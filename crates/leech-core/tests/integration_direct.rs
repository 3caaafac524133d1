//! Integration test: direct URLs served by a local HTTP server, run through
//! the full job pipeline (registry → direct transport → upload → finalizer).

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fakes::{RecordingEndpoint, ScriptedDaemon};
use common::http_server::{self, ServerOptions};
use leech_core::job::JobState;
use leech_core::messaging::MediaKind;
use leech_core::scheduler::{Leech, LeechRequest};
use leech_core::LeechError;
use tempfile::tempdir;

const GIB: u64 = 1024 * 1024 * 1024;

fn leech(root: &std::path::Path, max_size: u64) -> (Leech, Arc<RecordingEndpoint>) {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let leech = Leech::new(
        common::config(root, max_size),
        Arc::new(ScriptedDaemon::new("unused")),
        endpoint.clone(),
    );
    (leech, endpoint)
}

fn request(url: &str) -> LeechRequest {
    LeechRequest {
        owner: 42,
        chat: 42,
        reference: url.to_string(),
    }
}

#[tokio::test]
async fn direct_url_walks_every_state_and_uploads_video() {
    let body: Vec<u8> = (0u8..251).cycle().take(10 * 1024 * 1024).collect();
    let url = http_server::start("clip.mp4", body.clone());
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), 2 * GIB);
    let mut events = leech.registry().subscribe();

    let (id, handle) = leech.submit(request(&url)).await.unwrap();
    let summary = handle.await.unwrap();
    assert_eq!(summary.state, JobState::Done, "{:?}", summary.error);

    let events = common::drain(&mut events);
    assert_eq!(
        common::states_of(&events, id),
        vec![
            JobState::Queued,
            JobState::Resolving,
            JobState::Downloading,
            JobState::Downloaded,
            JobState::Classifying,
            JobState::Uploading,
            JobState::Done,
        ]
    );
    let transferred = common::transferred_of(&events, id);
    assert!(transferred.windows(2).all(|w| w[0] <= w[1]), "{:?}", transferred);
    assert_eq!(transferred.last().copied(), Some(body.len() as u64));

    let media = endpoint.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].name, "clip.mp4");
    assert_eq!(media[0].kind, MediaKind::Video);
    assert_eq!(media[0].size, body.len() as u64);
    assert_eq!(media[0].caption, "📹 clip.mp4\n💾 Size: 10.00 MB");

    let report = summary.report.unwrap();
    assert_eq!(report.uploaded.len(), 1);
    assert!(endpoint.last_text().unwrap().starts_with("✅ Upload completed!"));

    // Finalized: nothing left on disk or in the registry.
    assert!(leech.registry().get(id).is_err());
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn advertised_size_over_limit_never_downloads() {
    let url = http_server::start("big.iso", vec![0u8; 64 * 1024]);
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), 16 * 1024);
    let mut events = leech.registry().subscribe();

    let (id, handle) = leech.submit(request(&url)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Failed);
    assert!(matches!(summary.error, Some(LeechError::Capacity(_))));
    let states = common::states_of(&common::drain(&mut events), id);
    assert!(!states.contains(&JobState::Downloading), "{:?}", states);
    assert!(endpoint.media().is_empty());
    assert!(endpoint.last_text().unwrap().starts_with("❌ Error: capacity exceeded"));
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn size_discovered_mid_transfer_aborts_during_download() {
    let opts = ServerOptions {
        advertise_length: false,
        chunk_size: 8 * 1024,
        ..ServerOptions::default()
    };
    let url = http_server::start_with_options("stream.bin", vec![1u8; 256 * 1024], opts);
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), 32 * 1024);
    let mut events = leech.registry().subscribe();

    let (id, handle) = leech.submit(request(&url)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Failed);
    assert!(matches!(summary.error, Some(LeechError::Capacity(_))), "{:?}", summary.error);
    let states = common::states_of(&common::drain(&mut events), id);
    assert_eq!(
        &states[states.len() - 2..],
        &[JobState::Downloading, JobState::Failed]
    );
    assert!(!root.path().join(format!("job-{}", id)).join("stream.bin").exists());
    assert!(endpoint.media().is_empty());
}

#[tokio::test]
async fn unknown_length_under_limit_completes() {
    let opts = ServerOptions {
        advertise_length: false,
        head_allowed: false,
        ..ServerOptions::default()
    };
    let body = b"#!/bin/sh\necho leech\n".to_vec();
    let url = http_server::start_with_options("install.sh", body.clone(), opts);
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), GIB);

    let (_, handle) = leech.submit(request(&url)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Done, "{:?}", summary.error);
    let media = endpoint.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].name, "install.sh");
    assert_eq!(media[0].kind, MediaKind::Document);
    assert_eq!(media[0].size, body.len() as u64);
}

#[tokio::test]
async fn cancel_mid_download_leaves_nothing_behind() {
    let opts = ServerOptions {
        chunk_size: 16 * 1024,
        chunk_delay: Some(Duration::from_millis(20)),
        ..ServerOptions::default()
    };
    let url = http_server::start_with_options("slow.mkv", vec![3u8; 2 * 1024 * 1024], opts);
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), GIB);

    let (id, handle) = leech.submit(request(&url)).await.unwrap();
    common::wait_for_state(leech.registry(), id, JobState::Downloading).await;
    assert_eq!(leech.cancel(id, 42).unwrap(), JobState::Downloading);
    // The registry flips right away; cleanup follows in the job task.
    assert_eq!(
        leech.registry().get(id).map(|j| j.state).unwrap_or(JobState::Cancelled),
        JobState::Cancelled
    );

    let summary = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("job task did not stop after cancel")
        .unwrap();
    assert_eq!(summary.state, JobState::Cancelled);
    assert_eq!(endpoint.last_text().as_deref(), Some("🚫 Download cancelled."));
    assert!(endpoint.media().is_empty());
    assert!(leech.registry().get(id).is_err());
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn unrecognized_reference_is_rejected_up_front() {
    let root = tempdir().unwrap();
    let (leech, endpoint) = leech(root.path(), GIB);
    let err = leech.submit(request("just some words")).await.unwrap_err();
    assert!(matches!(err, LeechError::Source(_)));
    assert!(err.is_admission());
    assert!(leech.registry().is_empty());
    assert!(endpoint.texts.lock().unwrap().is_empty());
}
