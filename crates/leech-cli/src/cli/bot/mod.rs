//! Chat front end for `leech serve`: authorization, command routing and replies.

mod command;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use leech_core::job::{Job, JobState, OwnerId, Source};
use leech_core::messaging::telegram::{Document, Message, TelegramBot};
use leech_core::messaging::{ChatId, MessagingEndpoint};
use leech_core::progress::format_bytes;
use leech_core::scheduler::Leech;
use leech_core::source;
use leech_core::url_model::sanitize_filename;
use leech_core::LeechError;

pub use command::{parse_command, BotCommand};
use command::{
    CANCEL_USAGE_TEXT, HELP_TEXT, LEECH_USAGE_TEXT, NOT_A_LINK_TEXT, NOT_A_TORRENT_TEXT,
    NO_JOBS_TEXT, UNAUTHORIZED_TEXT, WELCOME_TEXT,
};

/// Uploaded descriptors are stored here, under the download root, so the
/// finalizer removes them with the job.
const TORRENT_SUBDIR: &str = "torrents";

pub struct Dispatcher {
    leech: Leech,
    bot: Arc<TelegramBot>,
}

impl Dispatcher {
    pub fn new(leech: Leech, bot: Arc<TelegramBot>) -> Self {
        Self { leech, bot }
    }

    /// Handle one inbound message; every outcome is answered in its chat.
    pub async fn handle(&self, message: Message) {
        let chat = message.chat.id;
        let Some(user) = message.from.as_ref().map(|u| u.id) else {
            tracing::debug!(chat, "ignoring message without sender");
            return;
        };

        let reply = if !self.leech.config().is_authorized(user) {
            tracing::info!(user, "unauthorized request");
            Some(UNAUTHORIZED_TEXT.to_string())
        } else if let Some(doc) = message.document.as_ref() {
            self.on_document(user, &message, doc).await
        } else if let Some(text) = message.text.as_deref() {
            respond(&self.leech, user, chat, text).await
        } else {
            None
        };

        if let Some(text) = reply {
            if let Err(e) = self.bot.send_text(chat, &text).await {
                tracing::warn!(chat, "reply not sent: {}", e);
            }
        }
    }

    async fn on_document(&self, owner: OwnerId, message: &Message, doc: &Document) -> Option<String> {
        let chat = message.chat.id;
        if !doc.is_torrent() {
            return Some(NOT_A_TORRENT_TEXT.to_string());
        }
        let name = doc.file_name.as_deref().unwrap_or(&doc.file_unique_id);
        let dest = descriptor_path(&self.leech.config().download_dir, chat, message.message_id, name);
        match self.bot.download_document(doc, &dest).await {
            Ok(path) => Some(start_descriptor(&self.leech, owner, chat, &path).await),
            Err(e) => {
                tracing::warn!(chat, "torrent descriptor download failed: {}", e);
                discard(&dest).await;
                Some(format!("❌ Could not fetch the torrent file: {}", e))
            }
        }
    }
}

/// Where an uploaded descriptor is stored: under the download root, so the
/// finalizer removes it with the job, and named after the message that
/// carried it so concurrent uploads of the same file never share a path.
pub fn descriptor_path(root: &Path, chat: ChatId, message_id: i64, file_name: &str) -> PathBuf {
    root.join(TORRENT_SUBDIR)
        .join(sanitize_filename(&format!("{}-{}-{}", chat, message_id, file_name)))
}

/// Admit a saved descriptor. No job owns the file until admission succeeds,
/// so a rejected descriptor is deleted here.
pub async fn start_descriptor(leech: &Leech, owner: OwnerId, chat: ChatId, path: &Path) -> String {
    let admitted = match source::classify(&path.to_string_lossy()) {
        Ok(source @ Source::TorrentFile(_)) => start(leech, owner, chat, source).await,
        Ok(other) => Err(LeechError::Source(format!("not a torrent file ({})", other.kind()))),
        Err(e) => Err(e),
    };
    match admitted {
        Ok(reply) => reply,
        Err(e) => {
            discard(path).await;
            tracing::info!(owner, "descriptor rejected: {}", e);
            format!("❌ {}", e)
        }
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "descriptor cleanup failed: {}", e),
    }
}

/// Answer a text message. `None` means the job's own status message
/// already speaks for the request.
pub async fn respond(leech: &Leech, owner: OwnerId, chat: ChatId, text: &str) -> Option<String> {
    let reply = match parse_command(text) {
        BotCommand::Start => WELCOME_TEXT.to_string(),
        BotCommand::Help => HELP_TEXT.to_string(),
        BotCommand::Leech(None) => LEECH_USAGE_TEXT.to_string(),
        BotCommand::Leech(Some(reference)) | BotCommand::Plain(reference) => {
            return start_from_text(leech, owner, chat, reference).await;
        }
        BotCommand::Cancel(arg) => cancel(leech, owner, arg),
        BotCommand::Status => status(&leech.jobs_for(owner)),
        BotCommand::Stats => match leech.stats().await {
            Ok(stats) => stats.render(),
            Err(e) => format!("❌ {}", e),
        },
        BotCommand::Unknown(name) => {
            format!("❌ Unknown command /{}. Use /help for more info.", name)
        }
    };
    Some(reply)
}

/// Chat text may name a URL or a magnet, never a local path.
async fn start_from_text(
    leech: &Leech,
    owner: OwnerId,
    chat: ChatId,
    reference: &str,
) -> Option<String> {
    let Ok(source) = source::classify_text(reference) else {
        return Some(NOT_A_LINK_TEXT.to_string());
    };
    match start(leech, owner, chat, source).await {
        Ok(reply) => Some(reply),
        Err(e) => {
            tracing::info!(owner, "request rejected: {}", e);
            Some(format!("❌ {}", e))
        }
    }
}

async fn start(
    leech: &Leech,
    owner: OwnerId,
    chat: ChatId,
    source: Source,
) -> Result<String, LeechError> {
    let (job_id, handle) = leech.submit_source(owner, chat, source).await?;
    tokio::spawn(async move {
        match handle.await {
            Ok(summary) => tracing::info!(job_id, state = %summary.state, "job finished"),
            Err(e) => tracing::error!(job_id, "job task failed: {}", e),
        }
    });
    Ok(format!("🆔 Job {} queued. Cancel with /cancel {}", job_id, job_id))
}

fn cancel(leech: &Leech, owner: OwnerId, arg: Option<&str>) -> String {
    let Some(job_id) = arg.and_then(|a| a.trim_start_matches('#').parse().ok()) else {
        return CANCEL_USAGE_TEXT.to_string();
    };
    match leech.cancel(job_id, owner) {
        Ok(_) => format!("🚫 Cancelling job {}.", job_id),
        Err(e) => format!("❌ {}", e),
    }
}

fn status(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return NO_JOBS_TEXT.to_string();
    }
    let mut out = String::from("📋 Your jobs:");
    for job in jobs {
        out.push_str(&format!("\n#{} {} {}", job.id, job.source.kind(), job.state));
        if job.state == JobState::Downloading {
            let p = &job.progress;
            match p.percent() {
                Some(percent) => out.push_str(&format!(" {:.1}%", percent)),
                None => out.push_str(&format!(" {}", format_bytes(p.bytes_transferred))),
            }
        }
    }
    out
}
