//! Messaging endpoint: where status text goes and artifacts are delivered.
//!
//! The core only needs three operations (send text, edit text, send a file
//! as a given media kind); [`telegram::TelegramBot`] implements them over the
//! Bot API, tests use in-process fakes.

pub mod telegram;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Chat (conversation) identifier on the endpoint.
pub type ChatId = i64;

/// A message the endpoint accepted; needed to edit it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message_id: i64,
}

/// How a file is presented to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Photo,
    Document,
}

impl MediaKind {
    pub fn icon(self) -> &'static str {
        match self {
            MediaKind::Video => "📹",
            MediaKind::Audio => "🎵",
            MediaKind::Photo => "🖼️",
            MediaKind::Document => "📄",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// The endpoint refused the request (bad format, file too big, ...).
    #[error("rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
    /// Rate limited; try again after the given delay.
    #[error("rate limited for {}s", retry_after.as_secs())]
    Throttled { retry_after: Duration },
    /// The target message or chat no longer accepts updates.
    #[error("gone: {0}")]
    Gone(String),
    /// Connection or protocol failure.
    #[error("transport: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MessagingEndpoint: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageRef, SendError>;

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), SendError>;

    /// Upload the file at `path`, streamed from disk, as `kind`.
    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, SendError>;
}
