//! Classification & Upload Pipeline.
//!
//! Each artifact gets a media kind (extension table first, content sniffing
//! for extension-less files) and is sent to the messaging endpoint one at a
//! time in ascending path order.

mod classify;
mod pipeline;

pub use classify::{detect_kind, kind_for_extension, sniff_kind};
pub use pipeline::{upload_artifacts, UploadOptions, UploadReport};
