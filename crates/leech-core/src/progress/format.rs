//! Human-readable units and status texts.

use crate::job::Progress;
use crate::messaging::MediaKind;

pub const STARTING_TEXT: &str = "⏳ Starting download...";
pub const DOWNLOAD_COMPLETE_TEXT: &str = "✅ Download complete! Starting upload...";
pub const CANCELLED_TEXT: &str = "🚫 Download cancelled.";

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// 1024-based size with two decimals: `1.50 MB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// `45s`, `3m 4s`, `1h 2m`.
pub fn format_eta(seconds: u64) -> String {
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}

/// Status message body for a running download.
pub fn render_progress(p: &Progress) -> String {
    let mut lines = vec!["📥 Downloading...".to_string(), String::new()];
    match (p.bytes_total, p.percent()) {
        (Some(total), Some(pct)) => {
            lines.push(format!("📊 Progress: {:.1}%", pct));
            lines.push(format!(
                "💾 Downloaded: {} / {}",
                format_bytes(p.bytes_transferred),
                format_bytes(total)
            ));
        }
        _ => lines.push(format!("💾 Downloaded: {}", format_bytes(p.bytes_transferred))),
    }
    if p.speed > 0 {
        lines.push(format!("⚡ Speed: {}", format_speed(p.speed)));
    }
    if let Some(eta) = p.eta_seconds {
        lines.push(format!("⏱ ETA: {}", format_eta(eta)));
    }
    lines.join("\n")
}

/// Caption attached to an uploaded file.
pub fn caption(kind: MediaKind, name: &str, size: u64) -> String {
    format!("{} {}\n💾 Size: {}", kind.icon(), name, format_bytes(size))
}
