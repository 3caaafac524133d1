//! Telegram Bot API implementation of [`MessagingEndpoint`].

mod api;
mod updates;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

pub use updates::{Chat, Document, Message, Update, User};

use super::{ChatId, MediaKind, MessageRef, MessagingEndpoint, SendError};
use crate::config::LeechConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

impl From<SentMessage> for MessageRef {
    fn from(m: SentMessage) -> Self {
        MessageRef {
            chat: m.chat.id,
            message_id: m.message_id,
        }
    }
}

pub struct TelegramBot {
    api_base: String,
    token: String,
    upload_timeout: Duration,
    long_poll: Duration,
    upload_buffer: usize,
}

impl TelegramBot {
    pub fn new(cfg: &LeechConfig) -> Self {
        Self {
            api_base: cfg.telegram.api_base.trim_end_matches('/').to_string(),
            token: cfg.telegram.bot_token.clone(),
            upload_timeout: Duration::from_secs(cfg.telegram.upload_timeout_secs),
            long_poll: Duration::from_secs(cfg.telegram.long_poll_secs),
            upload_buffer: cfg.upload_chunk_size,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T>(&self, method: &str, body: serde_json::Value, timeout: Duration) -> Result<T, SendError>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        let url = self.method_url(method);
        let body = serde_json::to_vec(&body).map_err(|e| SendError::Transport(e.to_string()))?;
        tokio::task::spawn_blocking(move || {
            let raw = api::post_json(&url, &body, timeout)?;
            api::decode::<T>(&raw)
        })
        .await
        .map_err(|e| SendError::Transport(format!("request task failed: {}", e)))?
    }
}

/// Bot API method and form field for a media kind.
fn media_method(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Audio => ("sendAudio", "audio"),
        MediaKind::Photo => ("sendPhoto", "photo"),
        MediaKind::Document => ("sendDocument", "document"),
    }
}

fn build_form(
    chat: ChatId,
    kind: MediaKind,
    path: &Path,
    caption: &str,
) -> Result<curl::easy::Form, curl::FormError> {
    let (_, field) = media_method(kind);
    let mut form = curl::easy::Form::new();
    form.part("chat_id").contents(chat.to_string().as_bytes()).add()?;
    form.part("caption").contents(caption.as_bytes()).add()?;
    if kind == MediaKind::Video {
        form.part("supports_streaming").contents(b"true").add()?;
    }
    let mut part = form.part(field);
    part.file(path);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        part.filename(name);
    }
    part.add()?;
    Ok(form)
}

#[async_trait]
impl MessagingEndpoint for TelegramBot {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageRef, SendError> {
        let sent: SentMessage = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat, "text": text, "disable_web_page_preview": true }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(sent.into())
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), SendError> {
        let result: Result<serde_json::Value, SendError> = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": message.chat,
                    "message_id": message.message_id,
                    "text": text,
                    "disable_web_page_preview": true,
                }),
                REQUEST_TIMEOUT,
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if api::is_not_modified(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, SendError> {
        let (method, _) = media_method(kind);
        let url = self.method_url(method);
        let path = path.to_path_buf();
        let caption = caption.to_string();
        let timeout = self.upload_timeout;
        let buffer = self.upload_buffer;
        let sent: SentMessage = tokio::task::spawn_blocking(move || {
            let form = build_form(chat, kind, &path, &caption)
                .map_err(|e| SendError::Transport(format!("building upload form: {}", e)))?;
            let raw = api::post_form(&url, form, timeout, buffer)?;
            api::decode::<SentMessage>(&raw)
        })
        .await
        .map_err(|e| SendError::Transport(format!("upload task failed: {}", e)))??;
        Ok(sent.into())
    }
}

impl TelegramBot {
    /// Long-poll for new updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, SendError> {
        let secs = self.long_poll.as_secs();
        self.call(
            "getUpdates",
            json!({ "offset": offset, "timeout": secs, "allowed_updates": ["message"] }),
            self.long_poll + REQUEST_TIMEOUT,
        )
        .await
    }

    /// Fetch an uploaded document and save it as `dest`, creating the
    /// parent directory. The caller picks a name unique to the upload.
    pub async fn download_document(&self, doc: &Document, dest: &Path) -> Result<PathBuf, SendError> {
        let file: updates::RemoteFile = self
            .call("getFile", json!({ "file_id": doc.file_id }), REQUEST_TIMEOUT)
            .await?;
        let remote = file
            .file_path
            .ok_or_else(|| SendError::Rejected {
                status: 400,
                description: "file is not downloadable".to_string(),
            })?;
        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, remote);
        let bytes = tokio::task::spawn_blocking(move || api::get(&url, REQUEST_TIMEOUT))
            .await
            .map_err(|e| SendError::Transport(format!("download task failed: {}", e)))??;

        let saving = |e: std::io::Error| SendError::Transport(format!("saving {}: {}", dest.display(), e));
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(saving)?;
        }
        tokio::fs::write(dest, &bytes).await.map_err(saving)?;
        Ok(dest.to_path_buf())
    }
}
