//! Streaming GET into a temp file (blocking; run inside `spawn_blocking`).

use std::cell::{Cell, RefCell};
use std::io;
use std::str;
use std::time::{Duration, Instant};

use super::error::FetchError;
use super::probe::{content_length_header, is_http};
use crate::control::AbortToken;
use crate::error::LeechError;
use crate::storage::StorageWriter;
use crate::transport::{ProgressSample, ProgressTx};

/// Parameters of one GET attempt.
#[derive(Debug, Clone)]
pub(super) struct FetchRequest {
    pub url: String,
    /// Size advertised by the HEAD probe, if any.
    pub expected_len: Option<u64>,
    pub max_size: u64,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub sample_interval: Duration,
}

/// Time-cadenced sampler: emits at most one sample per interval.
struct Sampler {
    interval: Duration,
    started: Instant,
    last_at: Instant,
    last_bytes: u64,
}

impl Sampler {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            started: now,
            last_at: now,
            last_bytes: 0,
        }
    }

    fn tick(&mut self, bytes: u64, total: Option<u64>, tx: &ProgressTx) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_at);
        if elapsed < self.interval {
            return;
        }
        let speed = rate(bytes.saturating_sub(self.last_bytes), elapsed);
        let _ = tx.try_send(ProgressSample {
            bytes_transferred: bytes,
            bytes_total: total,
            speed,
        });
        self.last_at = now;
        self.last_bytes = bytes;
    }

    /// Closing sample with the whole-transfer average speed.
    fn finish(&self, bytes: u64, total: Option<u64>, tx: &ProgressTx) {
        let _ = tx.try_send(ProgressSample {
            bytes_transferred: bytes,
            bytes_total: total,
            speed: rate(bytes, self.started.elapsed()),
        });
    }
}

fn rate(bytes: u64, over: Duration) -> u64 {
    let secs = over.as_secs_f64();
    if secs <= 0.0 {
        0
    } else {
        (bytes as f64 / secs) as u64
    }
}

/// Download `req.url` into `storage` from offset 0. Returns bytes written.
///
/// The size ceiling is enforced twice: against the response's
/// `Content-Length` as soon as the header arrives, and incrementally against
/// the running byte count for bodies of unknown size.
pub(super) fn fetch_to(
    req: &FetchRequest,
    storage: &StorageWriter,
    abort: &AbortToken,
    progress: &ProgressTx,
) -> Result<u64, FetchError> {
    let written = Cell::new(0u64);
    let advertised: Cell<Option<u64>> = Cell::new(None);
    let too_large = Cell::new(false);
    let storage_error: RefCell<Option<io::Error>> = RefCell::new(None);
    let sampler = RefCell::new(Sampler::new(req.sample_interval));
    let total = || advertised.get().or(req.expected_len);

    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(req.connect_timeout)?;
    // Abort if throughput stays below 1 KiB/s for the idle window.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(req.idle_timeout)?;
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            let Ok(line) = str::from_utf8(data) else {
                return true;
            };
            if line.starts_with("HTTP/") {
                advertised.set(None);
            } else if let Some(len) = content_length_header(line.trim_end()) {
                advertised.set(Some(len));
                if len > req.max_size {
                    too_large.set(true);
                    return false;
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            if abort.is_aborted() {
                return Ok(0);
            }
            let offset = written.get();
            let next = offset + data.len() as u64;
            if next > req.max_size {
                too_large.set(true);
                return Ok(0);
            }
            if let Err(e) = storage.write_at(offset, data) {
                storage_error.borrow_mut().replace(e);
                return Ok(0);
            }
            written.set(next);
            sampler.borrow_mut().tick(next, total(), progress);
            Ok(data.len())
        })?;
        // Called about once a second even when no data flows.
        transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if abort.is_aborted() {
            return Err(FetchError::Aborted);
        }
        if too_large.get() {
            return Err(FetchError::TooLarge {
                limit: req.max_size,
            });
        }
        if let Some(io_err) = storage_error.borrow_mut().take() {
            return Err(FetchError::Storage(LeechError::fs(storage.temp_path(), io_err)));
        }
        return Err(FetchError::Curl(e));
    }

    if is_http(&req.url) {
        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
    }

    let received = written.get();
    if let Some(expected) = total() {
        if received != expected {
            return Err(FetchError::PartialTransfer { expected, received });
        }
    }
    sampler.borrow().finish(received, Some(received), progress);
    Ok(received)
}
