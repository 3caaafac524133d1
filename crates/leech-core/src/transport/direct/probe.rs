//! HEAD probe: advertised size and filename hint before the transfer starts.

use std::str;
use std::time::Duration;

use super::error::FetchError;

/// What a HEAD request told us about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// Final status (after redirects); `None` for non-HTTP schemes.
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    /// URL after following redirects.
    pub effective_url: Option<String>,
}

impl HeadInfo {
    /// A failed status means the size is unknown, not that the job fails.
    pub fn usable(&self) -> bool {
        self.status.map_or(true, |c| (200..300).contains(&c))
    }
}

/// Blocking HEAD request; call from `spawn_blocking`.
pub(super) fn probe(url: &str, connect_timeout: Duration) -> Result<HeadInfo, FetchError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(connect_timeout * 2)?;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let mut info = parse_headers(&lines);
    if is_http(url) {
        info.status = Some(easy.response_code()?);
    }
    info.effective_url = easy.effective_url()?.map(str::to_string);
    Ok(info)
}

pub(super) fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Value of a `Content-Length` header line, if `line` is one.
pub(super) fn content_length_header(line: &str) -> Option<u64> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Parse header lines; a status line starts a new response (redirect chains),
/// so only the last response's headers count.
pub(crate) fn parse_headers(lines: &[String]) -> HeadInfo {
    let mut info = HeadInfo::default();
    for line in lines.iter().map(|l| l.trim()) {
        if line.starts_with("HTTP/") {
            info = HeadInfo::default();
            continue;
        }
        if let Some(len) = content_length_header(line) {
            info.content_length = Some(len);
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-disposition") {
                info.content_disposition = Some(value.trim().to_string());
            }
        }
    }
    info
}
