use thiserror::Error;

use crate::error::LeechError;
use crate::retry::{classify_curl_error, classify_http_status, ErrorKind};

/// Failure of a single direct fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("partial transfer: received {received} of {expected} bytes")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("resource exceeds the {limit}-byte limit")]
    TooLarge { limit: u64 },
    #[error("{0}")]
    Storage(LeechError),
    #[error("transfer aborted")]
    Aborted,
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Retry classification of this attempt's failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Curl(e) => classify_curl_error(e),
            FetchError::Http(code) => classify_http_status(*code),
            FetchError::PartialTransfer { .. } => ErrorKind::Connection,
            FetchError::TooLarge { .. }
            | FetchError::Storage(_)
            | FetchError::Aborted
            | FetchError::Task(_) => ErrorKind::Other,
        }
    }
}

impl From<FetchError> for LeechError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Http(code) => LeechError::Network {
                message: format!("server answered HTTP {}", code),
                status: Some(code),
            },
            FetchError::TooLarge { limit } => {
                LeechError::Capacity(format!("file is larger than the {}-byte limit", limit))
            }
            FetchError::Storage(inner) => inner,
            FetchError::Aborted => LeechError::Cancelled,
            other @ (FetchError::Curl(_)
            | FetchError::PartialTransfer { .. }
            | FetchError::Task(_)) => LeechError::Network {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
