//! Throttled, de-duplicated edits of one status message.

use std::sync::Arc;
use std::time::Duration;

use super::format::render_progress;
use super::throttle::ProgressThrottle;
use crate::job::{JobId, Progress};
use crate::messaging::{MessageRef, MessagingEndpoint, SendError};

pub struct ProgressReporter {
    job_id: JobId,
    endpoint: Arc<dyn MessagingEndpoint>,
    /// `None` once reporting has been given up for this job.
    message: Option<MessageRef>,
    throttle: ProgressThrottle,
    last_text: Option<String>,
}

impl ProgressReporter {
    pub fn new(
        job_id: JobId,
        endpoint: Arc<dyn MessagingEndpoint>,
        message: Option<MessageRef>,
        min_interval: Duration,
    ) -> Self {
        Self {
            job_id,
            endpoint,
            message,
            throttle: ProgressThrottle::new(min_interval),
            last_text: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<MessageRef> {
        self.message
    }

    /// Render `progress` and edit the status message if the text changed and
    /// the minimum interval has passed. Returns true if an edit went out.
    pub async fn report(&mut self, progress: &Progress) -> bool {
        if self.message.is_none() {
            return false;
        }
        let text = render_progress(progress);
        if self.last_text.as_deref() == Some(text.as_str()) {
            return false;
        }
        if !self.throttle.should_emit() {
            return false;
        }
        self.edit(text).await
    }

    /// Replace the status text right away (phase changes, final summary).
    pub async fn set_status(&mut self, text: &str) -> bool {
        if self.message.is_none() || self.last_text.as_deref() == Some(text) {
            return false;
        }
        let sent = self.edit(text.to_string()).await;
        // A phase text should not hold back the next progress edit.
        self.throttle.reset();
        sent
    }

    async fn edit(&mut self, text: String) -> bool {
        let Some(message) = self.message else {
            return false;
        };
        match self.endpoint.edit_text(&message, &text).await {
            Ok(()) => {
                self.last_text = Some(text);
                true
            }
            Err(SendError::Throttled { retry_after }) => {
                tracing::debug!(
                    job_id = self.job_id,
                    retry_after_secs = retry_after.as_secs(),
                    "status edit rate limited; skipping"
                );
                false
            }
            Err(e) => {
                tracing::warn!(job_id = self.job_id, "status edit failed, reporting disabled: {}", e);
                self.message = None;
                false
            }
        }
    }
}
