//! Progress Reporter.
//!
//! Transport samples flow through [`pump`], which records them in the job
//! registry and hands the resulting telemetry to a [`ProgressReporter`]. The
//! reporter edits the requester's status message at most once per interval
//! and only when the rendered text changed; a failing edit never fails the job.

mod format;
mod pump;
mod reporter;
mod throttle;

pub use format::{
    caption, format_bytes, format_eta, format_speed, render_progress, CANCELLED_TEXT,
    DOWNLOAD_COMPLETE_TEXT, STARTING_TEXT,
};
pub use pump::pump;
pub use reporter::ProgressReporter;
pub use throttle::ProgressThrottle;
