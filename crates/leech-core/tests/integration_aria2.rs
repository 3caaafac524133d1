//! Integration test: aria2 JSON-RPC client against a canned local server.

mod common;

use std::path::Path;
use std::sync::Arc;

use leech_core::config::DaemonConfig;
use leech_core::transport::daemon::{Aria2Client, DaemonError, DaemonRpc, DaemonStatus};
use serde_json::{json, Value};

fn reply(request: &Value) -> (u16, Value) {
    let id = request["id"].clone();
    let ok = |result: Value| (200, json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    match request["method"].as_str().unwrap_or("") {
        "aria2.addUri" | "aria2.addTorrent" => ok(json!("2089b05ecca3d829")),
        "aria2.tellStatus" => ok(json!({
            "gid": "2089b05ecca3d829",
            "status": "active",
            "totalLength": "34896138",
            "completedLength": "34896138",
            "downloadSpeed": "0",
            "followedBy": [],
            "files": [
                { "path": "/srv/leech/job-1/file.iso", "length": "34896138", "selected": "true" }
            ]
        })),
        "aria2.getVersion" => ok(json!({ "version": "1.37.0", "enabledFeatures": [] })),
        "aria2.forceRemove" => (
            400,
            json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": 1, "message": "Active Download not found for GID#2089b05ecca3d829" }
            }),
        ),
        _ => ok(json!("OK")),
    }
}

fn client(secret: &str) -> (Aria2Client, Arc<std::sync::Mutex<Vec<Value>>>) {
    let (host, port, seen) = common::rpc_server::start(Arc::new(reply));
    let cfg = DaemonConfig {
        host,
        port,
        secret: secret.to_string(),
        rpc_timeout_secs: 5,
    };
    (Aria2Client::new(&cfg), seen)
}

#[tokio::test]
async fn add_uri_sends_token_uri_list_and_dir() {
    let (client, seen) = client("s3cret");
    let gid = client
        .add_uri("magnet:?xt=urn:btih:abc", Path::new("/srv/leech/job-1"))
        .await
        .unwrap();
    assert_eq!(gid, "2089b05ecca3d829");

    let request = seen.lock().unwrap()[0].clone();
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["method"], "aria2.addUri");
    assert_eq!(
        request["params"],
        json!(["token:s3cret", ["magnet:?xt=urn:btih:abc"], { "dir": "/srv/leech/job-1" }])
    );
}

#[tokio::test]
async fn add_torrent_sends_base64_without_token_when_unset() {
    let (client, seen) = client("");
    client
        .add_torrent(b"d4:infod4:name1:aee", Path::new("/d"))
        .await
        .unwrap();
    let request = seen.lock().unwrap()[0].clone();
    assert_eq!(
        request["params"],
        json!(["ZDQ6aW5mb2Q0Om5hbWUxOmFlZQ==", [], { "dir": "/d" }])
    );
}

#[tokio::test]
async fn tell_status_decodes_counters_and_files() {
    let (client, seen) = client("");
    let status = client.tell_status("2089b05ecca3d829").await.unwrap();
    assert_eq!(status.status, DaemonStatus::Active);
    assert_eq!(status.bytes_total, 34_896_138);
    assert_eq!(status.known_total(), Some(34_896_138));
    assert_eq!(status.artifacts().len(), 1);

    let request = seen.lock().unwrap()[0].clone();
    assert_eq!(request["params"][0], "2089b05ecca3d829");
    assert!(request["params"][1]
        .as_array()
        .unwrap()
        .contains(&json!("followedBy")));
}

#[tokio::test]
async fn fault_with_http_400_is_a_daemon_fault() {
    let (client, _) = client("");
    let err = client.remove("2089b05ecca3d829").await.unwrap_err();
    assert!(matches!(err, DaemonError::Fault { code: 1, .. }), "{:?}", err);
    assert_eq!(client.get_version().await.unwrap(), "1.37.0");
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = Aria2Client::new(&DaemonConfig {
        host: "127.0.0.1".into(),
        port,
        secret: String::new(),
        rpc_timeout_secs: 2,
    });
    let err = client.get_version().await.unwrap_err();
    assert!(matches!(err, DaemonError::Unreachable(_)), "{:?}", err);
}
