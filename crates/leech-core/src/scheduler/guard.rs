//! RAII guard that unregisters a job's abort token when its task exits.

use crate::control::JobControl;
use crate::job::JobId;

pub(super) struct ControlGuard<'a> {
    pub(super) control: &'a JobControl,
    pub(super) job_id: JobId,
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.control.unregister(self.job_id);
    }
}
