//! Retry loop: run an async attempt until success or policy says stop.

use std::future::Future;

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::control::AbortToken;

/// Runs `attempt` until it succeeds, the policy gives up, or `abort` is raised.
///
/// `attempt` receives the 1-based attempt number. On a retryable failure the
/// loop sleeps for the backoff delay; when the abort token is raised during
/// the wait, the last error is returned without a further attempt.
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    abort: Option<&AbortToken>,
    classify: C,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorKind,
    E: std::fmt::Display,
{
    let mut n = 1u32;
    loop {
        match attempt(n).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(n, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt = n, ?kind, delay_ms = d.as_millis() as u64, "retrying after: {}", e);
                        tokio::time::sleep(d).await;
                        if abort.is_some_and(AbortToken::is_aborted) {
                            return Err(e);
                        }
                        n += 1;
                    }
                }
            }
        }
    }
}
