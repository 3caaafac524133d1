//! aria2 JSON-RPC 2.0 wire types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DaemonError, DaemonFile, DaemonJobStatus, DaemonStatus};

/// Fields requested from `aria2.tellStatus`.
pub(super) const STATUS_KEYS: &[&str] = &[
    "gid",
    "status",
    "totalLength",
    "completedLength",
    "downloadSpeed",
    "errorCode",
    "errorMessage",
    "followedBy",
    "files",
];

#[derive(Debug, Serialize)]
pub(super) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'a str,
    pub params: Vec<Value>,
}

impl<'a> RpcRequest<'a> {
    /// Build a request; a non-empty `secret` becomes the leading `token:` param.
    pub fn new(id: u64, method: &'a str, secret: &str, args: Vec<Value>) -> Self {
        let mut params = Vec::with_capacity(args.len() + 1);
        if !secret.is_empty() {
            params.push(Value::String(format!("token:{}", secret)));
        }
        params.extend(args);
        Self {
            jsonrpc: "2.0",
            id: format!("leech-{}", id),
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcFault {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn into_result(self) -> Result<Value, DaemonError> {
        if let Some(fault) = self.error {
            return Err(DaemonError::Fault {
                code: fault.code,
                message: fault.message,
            });
        }
        self.result
            .ok_or_else(|| DaemonError::Protocol("response has neither result nor error".into()))
    }
}

/// `tellStatus` result as aria2 sends it (numbers are decimal strings).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    gid: String,
    status: String,
    #[serde(default)]
    total_length: Option<String>,
    #[serde(default)]
    completed_length: Option<String>,
    #[serde(default)]
    download_speed: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    followed_by: Vec<String>,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    path: String,
    #[serde(default)]
    length: Option<String>,
    #[serde(default)]
    selected: Option<String>,
}

fn number(field: &str, raw: Option<&str>) -> Result<u64, DaemonError> {
    match raw {
        None | Some("") => Ok(0),
        Some(s) => s
            .parse()
            .map_err(|_| DaemonError::Protocol(format!("{} is not a number: {:?}", field, s))),
    }
}

pub(super) fn decode_status(value: Value) -> Result<DaemonJobStatus, DaemonError> {
    let raw: RawStatus =
        serde_json::from_value(value).map_err(|e| DaemonError::Protocol(e.to_string()))?;
    let status = DaemonStatus::parse(&raw.status)
        .ok_or_else(|| DaemonError::Protocol(format!("unknown status {:?}", raw.status)))?;

    let files = raw
        .files
        .into_iter()
        .map(|f| {
            Ok(DaemonFile {
                length: number("length", f.length.as_deref())?,
                selected: f.selected.as_deref() != Some("false"),
                path: PathBuf::from(f.path),
            })
        })
        .collect::<Result<Vec<_>, DaemonError>>()?;

    let error_message = match (raw.error_message, raw.error_code) {
        (Some(m), _) if !m.is_empty() => Some(m),
        (_, Some(code)) if code != "0" => Some(format!("daemon error code {}", code)),
        _ => None,
    };

    Ok(DaemonJobStatus {
        gid: raw.gid,
        status,
        bytes_total: number("totalLength", raw.total_length.as_deref())?,
        bytes_transferred: number("completedLength", raw.completed_length.as_deref())?,
        speed: number("downloadSpeed", raw.download_speed.as_deref())?,
        files,
        followed_by: raw.followed_by,
        error_message,
    })
}

/// A gid result (`addUri` / `addTorrent`).
pub(super) fn decode_gid(value: Value) -> Result<String, DaemonError> {
    match value {
        Value::String(gid) if !gid.is_empty() => Ok(gid),
        other => Err(DaemonError::Protocol(format!("expected a gid, got {}", other))),
    }
}

pub(super) fn decode_version(value: &Value) -> Result<String, DaemonError> {
    value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DaemonError::Protocol("getVersion result has no version".into()))
}
