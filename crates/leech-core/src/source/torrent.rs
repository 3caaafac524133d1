//! Torrent descriptor sniffing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Top-level keys a metainfo dictionary starts with (keys are sorted in bencode).
const LEADING_KEYS: &[&[u8]] = &[
    b"announce",
    b"announce-list",
    b"comment",
    b"created by",
    b"creation date",
    b"encoding",
    b"info",
    b"url-list",
];

const SNIFF_LEN: usize = 64;

/// True if `head` starts like a bencoded torrent metainfo: `d<len>:<key>`
/// with a key from the metainfo vocabulary.
pub fn looks_like_torrent(head: &[u8]) -> bool {
    let Some(rest) = head.strip_prefix(b"d") else {
        return false;
    };
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || rest.get(digits) != Some(&b':') {
        return false;
    }
    let len: usize = match std::str::from_utf8(&rest[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
    {
        Some(n) => n,
        None => return false,
    };
    let key_start = digits + 1;
    let Some(key_end) = key_start.checked_add(len) else {
        return false;
    };
    match rest.get(key_start..key_end) {
        Some(key) => LEADING_KEYS.contains(&key),
        None => false,
    }
}

pub(super) fn file_looks_like_torrent(path: &Path) -> bool {
    let mut head = [0u8; SNIFF_LEN];
    let n = match File::open(path).and_then(|mut f| f.read(&mut head)) {
        Ok(n) => n,
        Err(_) => return false,
    };
    looks_like_torrent(&head[..n])
}
