//! Disk I/O and file lifecycle.
//!
//! Temp files are written under a `.part` name (preallocated with fallocate
//! on Linux when the size is known) and atomically renamed to their final
//! name only after the transfer completed. Every job gets its own working
//! subdirectory under the download root.

mod builder;
mod space;
mod workspace;
mod writer;

pub use builder::StorageWriterBuilder;
pub use space::{available_space, ensure_space};
pub use workspace::JobWorkspace;
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `clip.mp4` → `clip.mp4.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("clip.mp4"));
        assert_eq!(p.to_string_lossy(), "clip.mp4.part");
        let p2 = temp_path(Path::new("/tmp/job-3/archive.zip"));
        assert_eq!(p2.to_string_lossy(), "/tmp/job-3/archive.zip.part");
    }

    #[test]
    fn write_then_finalize_moves_to_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.bin");
        let tp = temp_path(&final_path);

        let mut builder = StorageWriterBuilder::create(&tp).unwrap();
        builder.preallocate(10).unwrap();
        let writer = builder.build();

        writer.write_at(0, b"hello").unwrap();
        writer.write_at(5, b"world").unwrap();
        assert!(!final_path.exists());
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"helloworld");
    }

    #[test]
    fn discard_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("partial.bin.part");
        let writer = StorageWriterBuilder::create(&tp).unwrap().build();
        writer.write_at(0, b"abc").unwrap();
        assert!(tp.exists());
        writer.discard();
        assert!(!tp.exists());
    }
}
