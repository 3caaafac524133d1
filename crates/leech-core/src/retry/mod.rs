//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures) and
//! exponential backoff decisions shared by the direct transport, the daemon
//! client and the upload pipeline.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
