//! Source Classifier: tags an inbound reference as a direct URL, a magnet
//! link, or a local torrent descriptor.

mod torrent;

use std::path::Path;

use crate::error::{LeechError, Result};
use crate::job::Source;

pub use torrent::looks_like_torrent;

const MAGNET_PREFIX: &str = "magnet:";

/// URL schemes the direct transport can fetch.
const DIRECT_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Classify a reference string (chat text or the path of an uploaded file).
///
/// Rules, first match wins:
/// 1. `magnet:` prefix (any case) → [`Source::Magnet`]
/// 2. an existing file named `*.torrent` or whose leading bytes are a
///    bencoded torrent dictionary → [`Source::TorrentFile`]
/// 3. an absolute `http`, `https` or `ftp` URL with a host → [`Source::DirectUrl`]
///
/// Anything else is a [`LeechError::Source`].
pub fn classify(reference: &str) -> Result<Source> {
    let reference = non_empty(reference)?;
    if is_magnet(reference) {
        return Ok(Source::Magnet(reference.to_string()));
    }

    let path = Path::new(reference);
    if path.is_file() && (has_torrent_extension(path) || torrent::file_looks_like_torrent(path)) {
        return Ok(Source::TorrentFile(path.to_path_buf()));
    }

    classify_url(reference)
}

/// Classify text typed by a requester: a magnet link or a direct URL only.
/// Never touches the file system, so a local path is just unrecognized text.
pub fn classify_text(reference: &str) -> Result<Source> {
    let reference = non_empty(reference)?;
    if is_magnet(reference) {
        return Ok(Source::Magnet(reference.to_string()));
    }
    classify_url(reference)
}

fn non_empty(reference: &str) -> Result<&str> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(LeechError::Source("empty reference".to_string()));
    }
    Ok(reference)
}

fn classify_url(reference: &str) -> Result<Source> {
    match url::Url::parse(reference) {
        Ok(u) if DIRECT_SCHEMES.contains(&u.scheme()) && u.host_str().is_some() => {
            Ok(Source::DirectUrl(u.to_string()))
        }
        Ok(u) => Err(LeechError::Source(format!(
            "unsupported scheme '{}'",
            u.scheme()
        ))),
        Err(_) => Err(LeechError::Source(format!(
            "not a URL, magnet link or torrent file: {}",
            truncate_for_message(reference)
        ))),
    }
}

fn is_magnet(s: &str) -> bool {
    s.as_bytes()
        .get(..MAGNET_PREFIX.len())
        .map_or(false, |p| p.eq_ignore_ascii_case(MAGNET_PREFIX.as_bytes()))
}

fn has_torrent_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("torrent"))
}

fn truncate_for_message(s: &str) -> &str {
    match s.char_indices().nth(64) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
