//! Local filename derivation for direct downloads.
//!
//! Candidate order: `Content-Disposition` filename, then the last URL path
//! segment, then `download_<unix-seconds>`. Every candidate goes through
//! [`sanitize_filename`] before touching the file system.

mod content_disposition;
mod path;
mod sanitize;

use std::time::{SystemTime, UNIX_EPOCH};

pub use content_disposition::filename_from_content_disposition;
pub use path::filename_from_url_path;
pub use sanitize::{sanitize_filename, NAME_MAX};

/// Name used when nothing usable can be derived, stamped with `unix_secs`.
pub fn fallback_filename(unix_secs: u64) -> String {
    format!("download_{}", unix_secs)
}

/// Derive a safe filename for a direct download of `url`.
///
/// - `derive_filename("https://example.com/a/movie.mp4?sig=1", None)` → `"movie.mp4"`
/// - `derive_filename("https://example.com/get", Some("attachment; filename=\"x.zip\""))` → `"x.zip"`
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url_path(url));

    match candidate {
        Some(raw) => sanitize_filename(&raw),
        None => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            fallback_filename(now)
        }
    }
}
