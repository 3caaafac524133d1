//! Job state machine.

use std::fmt;

/// Lifecycle state of a job.
///
/// `Queued → Resolving → Downloading → Downloaded → Classifying → Uploading → Done`,
/// with `Failed` reachable from any non-terminal state and `Cancelled` from
/// any state before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Resolving,
    Downloading,
    Downloaded,
    Classifying,
    Uploading,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Resolving => "resolving",
            JobState::Downloading => "downloading",
            JobState::Downloaded => "downloaded",
            JobState::Classifying => "classifying",
            JobState::Uploading => "uploading",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }

    /// The next state on the success path, if any.
    fn successor(self) -> Option<JobState> {
        match self {
            JobState::Queued => Some(JobState::Resolving),
            JobState::Resolving => Some(JobState::Downloading),
            JobState::Downloading => Some(JobState::Downloaded),
            JobState::Downloaded => Some(JobState::Classifying),
            JobState::Classifying => Some(JobState::Uploading),
            JobState::Uploading => Some(JobState::Done),
            JobState::Done | JobState::Failed | JobState::Cancelled => None,
        }
    }

    /// Allowed-edge table. `Downloading → Downloading` is the only self-loop
    /// (progress ticks and transport handle hand-offs).
    pub fn can_transition_to(self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Failed | JobState::Cancelled => true,
            JobState::Downloading if self == JobState::Downloading => true,
            _ => self.successor() == Some(next),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
