//! In-process stand-ins for the messaging endpoint and the download daemon.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use leech_core::messaging::{ChatId, MediaKind, MessageRef, MessagingEndpoint, SendError};
use leech_core::transport::daemon::{
    DaemonError, DaemonFile, DaemonJobStatus, DaemonRpc, DaemonStatus,
};

/// One file delivered through the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub name: String,
    pub kind: MediaKind,
    pub size: u64,
    pub caption: String,
}

/// Messaging endpoint that accepts everything and keeps a log.
#[derive(Default)]
pub struct RecordingEndpoint {
    pub texts: Mutex<Vec<String>>,
    pub media: Mutex<Vec<Sent>>,
    next_id: AtomicUsize,
}

impl RecordingEndpoint {
    pub fn media(&self) -> Vec<Sent> {
        self.media.lock().unwrap().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MessagingEndpoint for RecordingEndpoint {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageRef, SendError> {
        self.texts.lock().unwrap().push(text.to_string());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) as i64 + 1;
        Ok(MessageRef {
            chat,
            message_id: id,
        })
    }

    async fn edit_text(&self, _message: &MessageRef, text: &str) -> Result<(), SendError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, SendError> {
        let size = std::fs::metadata(path)
            .map_err(|e| SendError::Transport(e.to_string()))?
            .len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.media.lock().unwrap().push(Sent {
            name,
            kind,
            size,
            caption: caption.to_string(),
        });
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) as i64 + 1;
        Ok(MessageRef {
            chat,
            message_id: id,
        })
    }
}

/// What `tellStatus` answers next for a gid.
#[derive(Debug, Clone)]
pub enum Step {
    Waiting,
    Active { done: u64, total: u64 },
    /// Creates the files (relative to the submit dir, with the given sizes).
    Complete {
        files: Vec<(&'static str, usize)>,
        followed_by: Option<&'static str>,
    },
    Error(&'static str),
    /// Removed on the daemon side (outside this job's control).
    Removed,
    Unreachable,
}

/// Daemon that plays back a per-gid script. The last step of a gid repeats.
pub struct ScriptedDaemon {
    first_gid: &'static str,
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    dir: Mutex<Option<PathBuf>>,
    /// `method gid` lines in call order.
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedDaemon {
    pub fn new(first_gid: &'static str) -> Self {
        Self {
            first_gid,
            script: Mutex::new(HashMap::new()),
            dir: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, gid: &str, steps: Vec<Step>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(gid.to_string(), steps.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(method))
            .count()
    }

    pub fn submit_dir(&self) -> Option<PathBuf> {
        self.dir.lock().unwrap().clone()
    }

    fn log(&self, line: String) {
        self.calls.lock().unwrap().push(line);
    }

    fn next_step(&self, gid: &str) -> Option<Step> {
        let mut script = self.script.lock().unwrap();
        let steps = script.get_mut(gid)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }

    fn status(&self, gid: &str, status: DaemonStatus) -> DaemonJobStatus {
        DaemonJobStatus {
            gid: gid.to_string(),
            status,
            bytes_total: 0,
            bytes_transferred: 0,
            speed: 0,
            files: Vec::new(),
            followed_by: Vec::new(),
            error_message: None,
        }
    }
}

#[async_trait]
impl DaemonRpc for ScriptedDaemon {
    async fn add_uri(&self, uri: &str, dir: &Path) -> Result<String, DaemonError> {
        self.log(format!("addUri {}", uri));
        *self.dir.lock().unwrap() = Some(dir.to_path_buf());
        Ok(self.first_gid.to_string())
    }

    async fn add_torrent(&self, torrent: &[u8], dir: &Path) -> Result<String, DaemonError> {
        self.log(format!("addTorrent {}", torrent.len()));
        *self.dir.lock().unwrap() = Some(dir.to_path_buf());
        Ok(self.first_gid.to_string())
    }

    async fn tell_status(&self, gid: &str) -> Result<DaemonJobStatus, DaemonError> {
        self.log(format!("tellStatus {}", gid));
        let step = self
            .next_step(gid)
            .ok_or_else(|| DaemonError::Fault {
                code: 1,
                message: format!("GID {} is not found", gid),
            })?;
        Ok(match step {
            Step::Waiting => self.status(gid, DaemonStatus::Waiting),
            Step::Active { done, total } => DaemonJobStatus {
                bytes_total: total,
                bytes_transferred: done,
                speed: 1024,
                ..self.status(gid, DaemonStatus::Active)
            },
            Step::Complete { files, followed_by } => {
                let dir = self.submit_dir().unwrap_or_default();
                let mut out = Vec::new();
                let mut total = 0u64;
                for (rel, len) in files {
                    let path = dir.join(rel);
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).unwrap();
                    }
                    std::fs::write(&path, vec![7u8; len]).unwrap();
                    total += len as u64;
                    out.push(DaemonFile {
                        path,
                        length: len as u64,
                        selected: true,
                    });
                }
                DaemonJobStatus {
                    bytes_total: total,
                    bytes_transferred: total,
                    files: out,
                    followed_by: followed_by.map(|g| vec![g.to_string()]).unwrap_or_default(),
                    ..self.status(gid, DaemonStatus::Complete)
                }
            }
            Step::Error(message) => DaemonJobStatus {
                error_message: Some(message.to_string()),
                ..self.status(gid, DaemonStatus::Error)
            },
            Step::Removed => self.status(gid, DaemonStatus::Removed),
            Step::Unreachable => {
                return Err(DaemonError::Unreachable("connection refused".into()))
            }
        })
    }

    async fn remove(&self, gid: &str) -> Result<(), DaemonError> {
        self.log(format!("remove {}", gid));
        Ok(())
    }

    async fn remove_download_result(&self, gid: &str) -> Result<(), DaemonError> {
        self.log(format!("removeDownloadResult {}", gid));
        Ok(())
    }

    async fn get_version(&self) -> Result<String, DaemonError> {
        Ok("1.37.0".into())
    }
}
