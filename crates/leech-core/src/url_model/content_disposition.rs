//! `Content-Disposition` filename extraction.

/// Filename carried by a `Content-Disposition` header value, if any.
///
/// Accepts `filename="quoted"`, `filename=token` and the RFC 5987 form
/// `filename*=UTF-8''percent%20encoded`; the extended form wins when both
/// are present.
pub fn filename_from_content_disposition(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in header_value.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "filename*" {
            if let Some(encoded) = strip_charset(value) {
                let decoded = percent_decode(encoded.trim_matches('"'));
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if key == "filename" {
            let v = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
                Some(inner) => unescape_quoted(inner),
                None => value.to_string(),
            };
            if !v.is_empty() {
                plain = Some(v);
            }
        }
    }

    plain
}

/// Strip the `charset'lang'` prefix of an extended parameter (UTF-8 only).
fn strip_charset(value: &str) -> Option<&str> {
    let (charset, rest) = value.split_once('\'')?;
    let (_lang, encoded) = rest.split_once('\'')?;
    charset.eq_ignore_ascii_case("utf-8").then_some(encoded)
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Lossy percent-decoding; malformed escapes are kept verbatim.
pub(super) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
