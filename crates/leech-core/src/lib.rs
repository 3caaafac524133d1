pub mod config;
pub mod error;
pub mod logging;

pub mod control;
pub mod finalize;
pub mod job;
pub mod messaging;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod storage;
pub mod transport;
pub mod upload;
pub mod url_model;

pub use error::{LeechError, Result};
