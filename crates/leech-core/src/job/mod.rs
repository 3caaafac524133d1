//! Job model and the in-memory Job Registry.
//!
//! The registry exclusively owns every in-flight job record. Transports and
//! the upload pipeline refer to jobs by id and report back through registry
//! operations, which are serialized per job id.

mod registry;
mod state;
mod types;

pub use registry::{JobEvent, JobRegistry, Limits};
pub use state::JobState;
pub use types::{Job, JobId, JobUpdate, OwnerId, Progress, Source, TransportHandle};
