//! aria2 JSON-RPC client over HTTP POST (curl in a blocking task).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use super::protocol::{self, RpcRequest, RpcResponse, STATUS_KEYS};
use super::{DaemonError, DaemonJobStatus, DaemonRpc};
use crate::config::DaemonConfig;

pub struct Aria2Client {
    endpoint: String,
    secret: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl Aria2Client {
    pub fn new(cfg: &DaemonConfig) -> Self {
        Self {
            endpoint: cfg.endpoint(),
            secret: cfg.secret.clone(),
            timeout: Duration::from_secs(cfg.rpc_timeout_secs.max(1)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, DaemonError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, &self.secret, args);
        let body = serde_json::to_vec(&request).map_err(|e| DaemonError::Protocol(e.to_string()))?;
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;

        let (code, raw) = tokio::task::spawn_blocking(move || post_json(&endpoint, &body, timeout))
            .await
            .map_err(|e| DaemonError::Unreachable(format!("rpc task failed: {}", e)))??;

        // aria2 answers faults with HTTP 400 and a JSON error body.
        match serde_json::from_slice::<RpcResponse>(&raw) {
            Ok(resp) => resp.into_result(),
            Err(_) if !(200..300).contains(&code) => {
                Err(DaemonError::Unreachable(format!("{} returned HTTP {}", method, code)))
            }
            Err(e) => Err(DaemonError::Protocol(e.to_string())),
        }
    }
}

/// Blocking POST; returns the status code and body.
fn post_json(endpoint: &str, body: &[u8], timeout: Duration) -> Result<(u32, Vec<u8>), DaemonError> {
    let unreachable = |e: curl::Error| DaemonError::Unreachable(e.to_string());
    let mut out = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(endpoint).map_err(unreachable)?;
    easy.post(true).map_err(unreachable)?;
    easy.post_fields_copy(body).map_err(unreachable)?;
    easy.connect_timeout(timeout).map_err(unreachable)?;
    easy.timeout(timeout).map_err(unreachable)?;
    let mut headers = curl::easy::List::new();
    headers
        .append("Content-Type: application/json")
        .map_err(unreachable)?;
    easy.http_headers(headers).map_err(unreachable)?;
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(unreachable)?;
        transfer.perform().map_err(unreachable)?;
    }
    let code = easy.response_code().map_err(unreachable)?;
    Ok((code, out))
}

fn dir_option(dir: &Path) -> Value {
    json!({ "dir": dir.to_string_lossy() })
}

#[async_trait]
impl DaemonRpc for Aria2Client {
    async fn add_uri(&self, uri: &str, dir: &Path) -> Result<String, DaemonError> {
        let v = self
            .call("aria2.addUri", vec![json!([uri]), dir_option(dir)])
            .await?;
        protocol::decode_gid(v)
    }

    async fn add_torrent(&self, torrent: &[u8], dir: &Path) -> Result<String, DaemonError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(torrent);
        let v = self
            .call(
                "aria2.addTorrent",
                vec![Value::String(encoded), json!([]), dir_option(dir)],
            )
            .await?;
        protocol::decode_gid(v)
    }

    async fn tell_status(&self, gid: &str) -> Result<DaemonJobStatus, DaemonError> {
        let v = self
            .call("aria2.tellStatus", vec![json!(gid), json!(STATUS_KEYS)])
            .await?;
        protocol::decode_status(v)
    }

    async fn remove(&self, gid: &str) -> Result<(), DaemonError> {
        self.call("aria2.forceRemove", vec![json!(gid)]).await?;
        Ok(())
    }

    async fn remove_download_result(&self, gid: &str) -> Result<(), DaemonError> {
        self.call("aria2.removeDownloadResult", vec![json!(gid)])
            .await?;
        Ok(())
    }

    async fn get_version(&self) -> Result<String, DaemonError> {
        let v = self.call("aria2.getVersion", vec![]).await?;
        protocol::decode_version(&v)
    }
}
