//! Integration test: magnets and torrent descriptors through a scripted
//! download daemon, run through the full job pipeline.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fakes::{RecordingEndpoint, ScriptedDaemon, Step};
use leech_core::job::JobState;
use leech_core::messaging::MediaKind;
use leech_core::scheduler::{Leech, LeechRequest};
use leech_core::LeechError;
use tempfile::tempdir;

const MAGNET: &str = "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10&dn=Sintel";
const MIB: u64 = 1024 * 1024;

fn setup(
    root: &std::path::Path,
    max_size: u64,
    daemon: ScriptedDaemon,
) -> (Leech, Arc<ScriptedDaemon>, Arc<RecordingEndpoint>) {
    let daemon = Arc::new(daemon);
    let endpoint = Arc::new(RecordingEndpoint::default());
    let leech = Leech::new(
        common::config(root, max_size),
        daemon.clone(),
        endpoint.clone(),
    );
    (leech, daemon, endpoint)
}

fn request(reference: &str) -> LeechRequest {
    LeechRequest {
        owner: 7,
        chat: 7,
        reference: reference.to_string(),
    }
}

#[tokio::test]
async fn magnet_single_file_is_polled_to_completion_and_uploaded() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("2089b05ecca3d829").script(
        "2089b05ecca3d829",
        vec![
            Step::Waiting,
            Step::Active {
                done: 1024,
                total: 4096,
            },
            Step::Active {
                done: 3072,
                total: 4096,
            },
            Step::Complete {
                files: vec![("Sintel/sintel.mp3", 4096)],
                followed_by: None,
            },
        ],
    );
    let (leech, daemon, endpoint) = setup(root.path(), MIB, daemon);
    let mut events = leech.registry().subscribe();

    let (id, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let summary = handle.await.unwrap();
    assert_eq!(summary.state, JobState::Done, "{:?}", summary.error);

    let states = common::states_of(&common::drain(&mut events), id);
    assert_eq!(states.last(), Some(&JobState::Done));
    assert!(states.contains(&JobState::Downloading));

    let media = endpoint.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].name, "sintel.mp3");
    assert_eq!(media[0].kind, MediaKind::Audio);
    assert_eq!(media[0].size, 4096);

    let submit_dir = daemon.submit_dir().unwrap();
    assert!(submit_dir.ends_with(format!("job-{}", id)));
    assert_eq!(daemon.calls()[0], format!("addUri {}", MAGNET));
    assert!(daemon.calls().contains(&"removeDownloadResult 2089b05ecca3d829".to_string()));
    assert!(common::files_under(root.path()).is_empty());
    assert!(leech.registry().is_empty());
}

#[tokio::test]
async fn multi_file_torrent_uploads_in_path_order_and_skips_oversized() {
    let root = tempdir().unwrap();
    let descriptors = tempdir().unwrap();
    let torrent = descriptors.path().join("season.torrent");
    std::fs::write(&torrent, b"d8:announce3:foo4:infod4:name6:seasonee").unwrap();

    let daemon = ScriptedDaemon::new("d4e5f6a7b8c9d0e1").script(
        "d4e5f6a7b8c9d0e1",
        vec![
            Step::Active {
                done: 10,
                total: 5000,
            },
            Step::Complete {
                files: vec![
                    ("season/ep2.mkv", 1000),
                    ("season/ep1.mkv", 1000),
                    ("season/extras.mkv", 3000),
                ],
                followed_by: None,
            },
        ],
    );
    let (leech, daemon, endpoint) = setup(root.path(), 2000, daemon);

    let (_, handle) = leech
        .submit(request(torrent.to_str().unwrap()))
        .await
        .unwrap();
    let summary = handle.await.unwrap();
    assert_eq!(summary.state, JobState::Done, "{:?}", summary.error);

    let names: Vec<String> = endpoint.media().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["ep1.mkv", "ep2.mkv"]);
    assert!(endpoint.media().iter().all(|s| s.kind == MediaKind::Video));

    let report = summary.report.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("season/extras.mkv"));
    assert_eq!(report.failures[0].1.kind(), "upload");

    let text = endpoint.last_text().unwrap();
    assert!(text.contains("Uploaded 2 of 3 file(s)"), "{}", text);
    assert!(text.contains("⚠️ extras.mkv: file is too large"), "{}", text);

    assert_eq!(daemon.count("addTorrent"), 1);
    // A descriptor outside the download root belongs to the caller.
    assert!(torrent.exists());
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn unreachable_daemon_fails_only_after_retry_budget() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("0a0a0a0a0a0a0a0a")
        .script("0a0a0a0a0a0a0a0a", vec![Step::Unreachable]);
    let (leech, daemon, endpoint) = setup(root.path(), MIB, daemon);

    let (_, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Failed);
    assert!(matches!(summary.error, Some(LeechError::Rpc(_))), "{:?}", summary.error);
    // config() allows three attempts per poll.
    assert_eq!(daemon.count("tellStatus"), 3);
    assert!(endpoint.last_text().unwrap().starts_with("❌ Error: download daemon error"));
    assert_eq!(daemon.count("remove"), 1);
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn daemon_error_status_fails_without_retry() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("1b1b1b1b1b1b1b1b").script(
        "1b1b1b1b1b1b1b1b",
        vec![
            Step::Active {
                done: 0,
                total: 100,
            },
            Step::Error("No peers found"),
        ],
    );
    let (leech, daemon, _endpoint) = setup(root.path(), MIB, daemon);

    let (_, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Failed);
    assert_eq!(summary.error, Some(LeechError::Rpc("No peers found".into())));
    assert_eq!(daemon.count("tellStatus"), 2);
}

#[tokio::test]
async fn metadata_download_hands_off_to_followed_gid() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("meta000000000001")
        .script(
            "meta000000000001",
            vec![Step::Complete {
                files: vec![("[METADATA]08ada5a7", 16)],
                followed_by: Some("data000000000002"),
            }],
        )
        .script(
            "data000000000002",
            vec![
                Step::Active {
                    done: 100,
                    total: 200,
                },
                Step::Complete {
                    files: vec![("cover.png", 200)],
                    followed_by: None,
                },
            ],
        );
    let (leech, daemon, endpoint) = setup(root.path(), MIB, daemon);

    let (_, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let summary = handle.await.unwrap();
    assert_eq!(summary.state, JobState::Done, "{:?}", summary.error);

    let media = endpoint.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].name, "cover.png");
    assert_eq!(media[0].kind, MediaKind::Photo);

    let calls = daemon.calls();
    assert!(calls.contains(&"removeDownloadResult meta000000000001".to_string()));
    assert!(calls.contains(&"tellStatus data000000000002".to_string()));
    assert!(calls.contains(&"remove data000000000002".to_string()));
}

#[tokio::test]
async fn per_owner_limit_rejects_second_job_immediately() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("2c2c2c2c2c2c2c2c").script("2c2c2c2c2c2c2c2c", vec![Step::Waiting]);
    let daemon = Arc::new(daemon);
    let mut cfg = common::config(root.path(), MIB);
    cfg.max_jobs_per_owner = 1;
    let leech = Leech::new(cfg, daemon.clone(), Arc::new(RecordingEndpoint::default()));

    let (id, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let err = leech.submit(request(MAGNET)).await.unwrap_err();
    assert!(matches!(err, LeechError::Capacity(_)));
    assert_eq!(leech.registry().active_for_owner(7), 1);
    assert_eq!(leech.registry().len(), 1);

    leech.cancel(id, 7).unwrap();
    assert_eq!(handle.await.unwrap().state, JobState::Cancelled);
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn cancel_while_polling_releases_daemon_job_and_cleans_up() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("3d3d3d3d3d3d3d3d").script(
        "3d3d3d3d3d3d3d3d",
        vec![Step::Active {
            done: 512,
            total: 4096,
        }],
    );
    let (leech, daemon, endpoint) = setup(root.path(), MIB, daemon);

    let (id, handle) = leech.submit(request(MAGNET)).await.unwrap();
    common::wait_for_state(leech.registry(), id, JobState::Downloading).await;
    assert!(root.path().join(format!("job-{}", id)).is_dir());
    assert_eq!(leech.cancel(id, 7).unwrap(), JobState::Downloading);

    let summary = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("job task did not stop after cancel")
        .unwrap();
    assert_eq!(summary.state, JobState::Cancelled);
    assert!(summary.error.is_none());
    assert_eq!(endpoint.last_text().as_deref(), Some("🚫 Download cancelled."));

    let calls = daemon.calls();
    assert!(calls.contains(&"remove 3d3d3d3d3d3d3d3d".to_string()), "{:?}", calls);
    assert!(calls.contains(&"removeDownloadResult 3d3d3d3d3d3d3d3d".to_string()), "{:?}", calls);
    assert!(endpoint.media().is_empty());
    assert!(leech.registry().is_empty());
    assert!(!root.path().join(format!("job-{}", id)).exists());
    assert!(common::files_under(root.path()).is_empty());
}

#[tokio::test]
async fn download_removed_on_the_daemon_ends_cancelled() {
    let root = tempdir().unwrap();
    let daemon = ScriptedDaemon::new("4e4e4e4e4e4e4e4e").script(
        "4e4e4e4e4e4e4e4e",
        vec![
            Step::Active {
                done: 100,
                total: 1000,
            },
            Step::Removed,
        ],
    );
    let (leech, _daemon, endpoint) = setup(root.path(), MIB, daemon);
    let mut events = leech.registry().subscribe();

    let (id, handle) = leech.submit(request(MAGNET)).await.unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.state, JobState::Cancelled);
    assert!(summary.error.is_none());
    let states = common::states_of(&common::drain(&mut events), id);
    assert_eq!(
        &states[states.len() - 2..],
        &[JobState::Downloading, JobState::Cancelled]
    );
    assert_eq!(endpoint.last_text().as_deref(), Some("🚫 Download cancelled."));
    assert!(leech.registry().is_empty());
    assert!(common::files_under(root.path()).is_empty());
}
