//! Filename sanitization.

/// Longest file name accepted by common file systems, in bytes.
pub const NAME_MAX: usize = 255;

const DEFAULT_NAME: &str = "download";

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

/// Make `name` safe to create inside a job directory.
///
/// Reserved characters (`< > : " / \ | ? *`) and control characters become
/// `_`, leading/trailing dots and spaces are stripped, an empty result becomes
/// `download`, and names longer than [`NAME_MAX`] bytes are cut down while
/// keeping the extension.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    if trimmed.len() <= NAME_MAX {
        return trimmed.to_string();
    }

    let (stem, ext) = match trimmed.rfind('.') {
        Some(dot) if trimmed.len() - dot < NAME_MAX => trimmed.split_at(dot),
        _ => (trimmed, ""),
    };
    let mut out = truncate_utf8(stem, NAME_MAX - ext.len()).to_string();
    out.push_str(ext);
    out
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
