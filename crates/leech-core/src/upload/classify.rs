//! Media kind detection.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::messaging::MediaKind;

const VIDEO: &[&str] = &["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm"];
const AUDIO: &[&str] = &["mp3", "m4a", "wav", "flac", "ogg", "aac"];
const PHOTO: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

const SNIFF_LEN: usize = 16;

/// Kind for a file extension (case-insensitive, without the dot). Unknown
/// extensions are documents.
pub fn kind_for_extension(ext: &str) -> MediaKind {
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();
    if VIDEO.contains(&ext) {
        MediaKind::Video
    } else if AUDIO.contains(&ext) {
        MediaKind::Audio
    } else if PHOTO.contains(&ext) {
        MediaKind::Photo
    } else {
        MediaKind::Document
    }
}

/// Kind from leading file bytes, for files without an extension.
pub fn sniff_kind(head: &[u8]) -> Option<MediaKind> {
    let at = |offset: usize, magic: &[u8]| head.get(offset..offset + magic.len()) == Some(magic);

    if at(4, b"ftyp") {
        // ISO base media: audio-only brands vs. everything else.
        return Some(if at(8, b"M4A ") || at(8, b"M4B ") {
            MediaKind::Audio
        } else {
            MediaKind::Video
        });
    }
    if at(0, b"RIFF") {
        return match head.get(8..12) {
            Some(b"AVI ") => Some(MediaKind::Video),
            Some(b"WAVE") => Some(MediaKind::Audio),
            Some(b"WEBP") => Some(MediaKind::Photo),
            _ => None,
        };
    }
    if at(0, &[0x1A, 0x45, 0xDF, 0xA3]) || at(0, b"FLV") {
        return Some(MediaKind::Video);
    }
    if at(0, b"ID3") || at(0, &[0xFF, 0xFB]) || at(0, b"fLaC") || at(0, b"OggS") {
        return Some(MediaKind::Audio);
    }
    if at(0, &[0x89, b'P', b'N', b'G']) || at(0, &[0xFF, 0xD8, 0xFF]) || at(0, b"GIF8") {
        return Some(MediaKind::Photo);
    }
    None
}

/// Kind of the file at `path`: by extension when it has one, otherwise by
/// its first bytes; anything unrecognized (or unreadable) is a document.
pub async fn detect_kind(path: &Path) -> MediaKind {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return kind_for_extension(ext);
    }
    let mut head = [0u8; SNIFF_LEN];
    let read = match tokio::fs::File::open(path).await {
        Ok(mut f) => f.read(&mut head).await.unwrap_or(0),
        Err(_) => 0,
    };
    sniff_kind(&head[..read]).unwrap_or(MediaKind::Document)
}
