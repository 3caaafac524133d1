//! Job Registry: the single owner of every in-flight job record.
//!
//! The map lock is held only long enough to look up (or insert/remove) the
//! per-job cell; every mutation of a job happens under that job's own mutex,
//! so operations on distinct ids never wait on each other. No lock is held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use tokio::sync::broadcast;

use super::state::JobState;
use super::types::{Job, JobId, JobUpdate, OwnerId, Progress, Source, TransportHandle};
use crate::config::LeechConfig;
use crate::error::{LeechError, Result};

const EVENT_CAPACITY: usize = 256;

/// Concurrency ceilings enforced by [`JobRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_per_owner: usize,
    pub max_global: usize,
}

impl From<&LeechConfig> for Limits {
    fn from(cfg: &LeechConfig) -> Self {
        Self {
            max_per_owner: cfg.max_jobs_per_owner,
            max_global: cfg.max_concurrent_jobs,
        }
    }
}

/// Lifecycle events published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Created {
        id: JobId,
        owner: OwnerId,
    },
    Transitioned {
        id: JobId,
        from: JobState,
        to: JobState,
    },
    Progress {
        id: JobId,
        bytes_transferred: u64,
        bytes_total: Option<u64>,
    },
    Removed {
        id: JobId,
    },
}

type JobCell = Arc<Mutex<Job>>;

pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobCell>>,
    next_id: AtomicU64,
    limits: Limits,
    events: broadcast::Sender<JobEvent>,
}

fn lock(cell: &JobCell) -> MutexGuard<'_, Job> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobRegistry {
    pub fn new(limits: Limits) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            limits,
            events,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Subscribe to lifecycle events. Lagging receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: JobEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn cell(&self, id: JobId) -> Result<JobCell> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(LeechError::NotFound(id))
    }

    /// Register a new job in `Queued`. The capacity check and the insert
    /// happen under one write lock, so two racing creates cannot both pass.
    pub fn create(&self, owner: OwnerId, source: Source) -> Result<Job> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        let mut global = 0usize;
        let mut for_owner = 0usize;
        for cell in jobs.values() {
            let job = lock(cell);
            if job.state.is_terminal() {
                continue;
            }
            global += 1;
            if job.owner == owner {
                for_owner += 1;
            }
        }
        if for_owner >= self.limits.max_per_owner {
            return Err(LeechError::Capacity(format!(
                "you already have {} active job(s); limit is {}",
                for_owner, self.limits.max_per_owner
            )));
        }
        if global >= self.limits.max_global {
            return Err(LeechError::Capacity(format!(
                "{} jobs are running; try again later",
                global
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, owner, source);
        jobs.insert(id, Arc::new(Mutex::new(job.clone())));
        drop(jobs);

        tracing::debug!(job_id = id, owner, source = job.source.kind(), "job created");
        self.publish(JobEvent::Created { id, owner });
        Ok(job)
    }

    /// Move a job along the state machine, applying `update` atomically with the move.
    pub fn transition(&self, id: JobId, to: JobState, update: JobUpdate) -> Result<()> {
        let cell = self.cell(id)?;
        let from = {
            let mut job = lock(&cell);
            let from = job.state;
            if !from.can_transition_to(to) {
                return Err(LeechError::InvalidState { id, from, to });
            }
            job.state = to;
            if from != to {
                job.history.push(to);
            }
            if let Some(total) = update.bytes_total {
                job.progress.bytes_total = Some(total.max(job.progress.bytes_transferred));
            }
            if let Some(mut artifacts) = update.artifacts {
                artifacts.sort();
                job.artifacts = artifacts;
            }
            if to == JobState::Failed {
                job.error = update.error;
            }
            from
        };
        if from != to {
            tracing::debug!(job_id = id, %from, %to, "job transition");
            self.publish(JobEvent::Transitioned { id, from, to });
        }
        Ok(())
    }

    /// Shorthand for `transition(id, Failed, error)`.
    pub fn fail(&self, id: JobId, err: LeechError) -> Result<()> {
        self.transition(id, JobState::Failed, JobUpdate::error(err))
    }

    /// Explicit cancel request. Idempotent for an already-cancelled job;
    /// returns the state the job was in.
    pub fn cancel(&self, id: JobId) -> Result<JobState> {
        let cell = self.cell(id)?;
        let from = {
            let mut job = lock(&cell);
            let from = job.state;
            if from == JobState::Cancelled {
                return Ok(from);
            }
            if !from.can_transition_to(JobState::Cancelled) {
                return Err(LeechError::InvalidState {
                    id,
                    from,
                    to: JobState::Cancelled,
                });
            }
            job.state = JobState::Cancelled;
            job.history.push(JobState::Cancelled);
            from
        };
        tracing::info!(job_id = id, %from, "job cancelled");
        self.publish(JobEvent::Transitioned {
            id,
            from,
            to: JobState::Cancelled,
        });
        Ok(from)
    }

    /// Record a progress sample. Only accepted while `Downloading`;
    /// `bytes_transferred` never moves backwards and never exceeds a known total.
    pub fn record_progress(
        &self,
        id: JobId,
        bytes_transferred: u64,
        bytes_total: Option<u64>,
        speed: u64,
    ) -> Result<Progress> {
        let cell = self.cell(id)?;
        let progress = {
            let mut job = lock(&cell);
            if job.state != JobState::Downloading {
                return Err(LeechError::InvalidState {
                    id,
                    from: job.state,
                    to: JobState::Downloading,
                });
            }
            let p = &mut job.progress;
            p.bytes_transferred = p.bytes_transferred.max(bytes_transferred);
            if let Some(total) = bytes_total {
                p.bytes_total = Some(p.bytes_total.unwrap_or(0).max(total));
            }
            if let Some(total) = p.bytes_total {
                if p.bytes_transferred > total {
                    p.bytes_total = Some(p.bytes_transferred);
                }
            }
            p.speed = speed;
            p.eta_seconds = match p.bytes_total {
                Some(total) if speed > 0 => Some((total - p.bytes_transferred) / speed),
                _ => None,
            };
            p.clone()
        };
        self.publish(JobEvent::Progress {
            id,
            bytes_transferred: progress.bytes_transferred,
            bytes_total: progress.bytes_total,
        });
        Ok(progress)
    }

    /// Attach (or hand off) the transport handle. A job never switches
    /// between a local and a daemon handle.
    pub fn attach_transport(&self, id: JobId, handle: TransportHandle) -> Result<()> {
        let cell = self.cell(id)?;
        let mut job = lock(&cell);
        let compatible = job
            .transport
            .as_ref()
            .map_or(true, |current| current.same_kind(&handle));
        if job.state.is_terminal() || !compatible {
            return Err(LeechError::InvalidState {
                id,
                from: job.state,
                to: job.state,
            });
        }
        tracing::debug!(job_id = id, handle = ?handle, "transport attached");
        job.transport = Some(handle);
        Ok(())
    }

    /// Stamp the time of the last status-message edit.
    pub fn note_progress_edit(&self, id: JobId) -> Result<()> {
        let cell = self.cell(id)?;
        lock(&cell).last_progress_edit_at = Some(Instant::now());
        Ok(())
    }

    /// Snapshot of one job.
    pub fn get(&self, id: JobId) -> Result<Job> {
        let cell = self.cell(id)?;
        let job = lock(&cell).clone();
        Ok(job)
    }

    /// Snapshots of every job of `owner`, oldest first.
    pub fn list_by_owner(&self, owner: OwnerId) -> Vec<Job> {
        let cells: Vec<JobCell> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut out: Vec<Job> = cells
            .iter()
            .map(|c| lock(c).clone())
            .filter(|j| j.owner == owner)
            .collect();
        out.sort_by_key(|j| j.id);
        out
    }

    /// Drop a terminal job from the registry (Finalizer only).
    pub fn remove(&self, id: JobId) -> Result<Job> {
        let cell = self.cell(id)?;
        let snapshot = {
            let job = lock(&cell);
            if !job.state.is_terminal() {
                return Err(LeechError::Active {
                    id,
                    state: job.state,
                });
            }
            job.clone()
        };
        // Terminal states have no outgoing edges, so the check above still holds.
        let removed = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(_) => {
                self.publish(JobEvent::Removed { id });
                Ok(snapshot)
            }
            None => Err(LeechError::NotFound(id)),
        }
    }

    /// Number of non-terminal jobs across all owners.
    pub fn active_count(&self) -> usize {
        self.count_active(|_| true)
    }

    /// Number of non-terminal jobs of one owner.
    pub fn active_for_owner(&self, owner: OwnerId) -> usize {
        self.count_active(|job| job.owner == owner)
    }

    /// Ids of every non-terminal job, ascending.
    pub fn active_ids(&self) -> Vec<JobId> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<JobId> = jobs
            .iter()
            .filter(|(_, cell)| !lock(cell).state.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn count_active<F: Fn(&Job) -> bool>(&self, pred: F) -> usize {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.values()
            .filter(|cell| {
                let job = lock(cell);
                !job.state.is_terminal() && pred(&job)
            })
            .count()
    }

    /// Total records held, terminal ones included.
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
