//! Bot API envelope and the blocking curl calls behind it.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::messaging::SendError;

#[derive(Debug, Deserialize)]
pub(super) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// Map a failed envelope onto [`SendError`].
pub(super) fn api_error(
    code: Option<u16>,
    description: Option<String>,
    retry_after: Option<u64>,
) -> SendError {
    let description = description.unwrap_or_else(|| "unknown error".to_string());
    let lower = description.to_ascii_lowercase();
    if lower.contains("message to edit not found")
        || lower.contains("message can't be edited")
        || lower.contains("chat not found")
    {
        return SendError::Gone(description);
    }
    match code {
        Some(429) => SendError::Throttled {
            retry_after: Duration::from_secs(retry_after.unwrap_or(1)),
        },
        Some(403) => SendError::Gone(description),
        Some(status @ (400 | 413)) => SendError::Rejected {
            status,
            description,
        },
        Some(status) => SendError::Transport(format!("HTTP {}: {}", status, description)),
        None => SendError::Transport(description),
    }
}

/// Decode a Bot API body into its `result`.
pub(super) fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, SendError> {
    let resp: ApiResponse<T> = serde_json::from_slice(raw)
        .map_err(|e| SendError::Transport(format!("unreadable API response: {}", e)))?;
    if resp.ok {
        return resp
            .result
            .ok_or_else(|| SendError::Transport("API response without result".to_string()));
    }
    Err(api_error(
        resp.error_code,
        resp.description,
        resp.parameters.and_then(|p| p.retry_after),
    ))
}

/// True for the harmless "message is not modified" edit failure.
pub(super) fn is_not_modified(err: &SendError) -> bool {
    matches!(err, SendError::Rejected { description, .. }
        if description.to_ascii_lowercase().contains("message is not modified"))
}

fn transport(e: curl::Error) -> SendError {
    SendError::Transport(e.to_string())
}

fn perform(mut easy: curl::easy::Easy) -> Result<Vec<u8>, SendError> {
    let mut out = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport)?;
        transfer.perform().map_err(transport)?;
    }
    Ok(out)
}

/// POST a JSON body (blocking).
pub(super) fn post_json(url: &str, body: &[u8], timeout: Duration) -> Result<Vec<u8>, SendError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(transport)?;
    easy.post(true).map_err(transport)?;
    easy.post_fields_copy(body).map_err(transport)?;
    easy.timeout(timeout).map_err(transport)?;
    let mut headers = curl::easy::List::new();
    headers
        .append("Content-Type: application/json")
        .map_err(transport)?;
    easy.http_headers(headers).map_err(transport)?;
    perform(easy)
}

/// POST a multipart form (blocking). File parts are read from disk by libcurl
/// through a buffer of `upload_buffer` bytes.
pub(super) fn post_form(
    url: &str,
    form: curl::easy::Form,
    timeout: Duration,
    upload_buffer: usize,
) -> Result<Vec<u8>, SendError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(transport)?;
    easy.httppost(form).map_err(transport)?;
    easy.upload_buffer_size(upload_buffer).map_err(transport)?;
    easy.timeout(timeout).map_err(transport)?;
    perform(easy)
}

/// Plain GET (blocking); non-2xx is an error.
pub(super) fn get(url: &str, timeout: Duration) -> Result<Vec<u8>, SendError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(transport)?;
    easy.follow_location(true).map_err(transport)?;
    easy.timeout(timeout).map_err(transport)?;
    let mut out = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport)?;
        transfer.perform().map_err(transport)?;
    }
    let code = easy.response_code().map_err(transport)?;
    if !(200..300).contains(&code) {
        return Err(SendError::Transport(format!("file download returned HTTP {}", code)));
    }
    Ok(out)
}
