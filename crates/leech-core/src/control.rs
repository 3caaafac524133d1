//! Cooperative cancellation: shared abort tokens per running job.
//!
//! Each running job task is registered with an abort token. A cancel request
//! raises the token; transports check it at their next suspension point
//! (curl write callback, poll tick, between uploads) and stop with
//! `LeechError::Cancelled`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::job::JobId;

/// Abort flag handed to every stage of one job.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared registry of job id -> abort token.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<JobId, AbortToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job; returns the abort token to pass to its stages.
    pub fn register(&self, job_id: JobId) -> AbortToken {
        let token = AbortToken::new();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, token.clone());
        token
    }

    /// Unregister a job (call when the job task exits).
    pub fn unregister(&self, job_id: JobId) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }

    /// Raise the abort token of a running job. Returns false if no task is registered.
    pub fn request_abort(&self, job_id: JobId) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
        {
            Some(token) => {
                token.abort();
                true
            }
            None => false,
        }
    }

    /// Raise every registered token (shutdown).
    pub fn abort_all(&self) {
        for token in self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            token.abort();
        }
    }

    pub fn running(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
