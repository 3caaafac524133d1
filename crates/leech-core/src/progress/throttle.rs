//! Minimum-interval gate for status edits.

use std::time::{Duration, Instant};

pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// True (and arms the gate) if the interval has elapsed since the last emit.
    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Let the next check pass regardless of timing.
    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}
