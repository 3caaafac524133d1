//! `leech classify <reference>` – show the source kind and transport without downloading.

use anyhow::Result;
use leech_core::job::Source;
use leech_core::source;
use leech_core::upload::kind_for_extension;
use leech_core::url_model::{filename_from_url_path, sanitize_filename};

/// One line per fact, tab separated: kind, transport, and a detail.
pub fn describe(source: &Source) -> String {
    let transport = if source.is_delegated() { "daemon" } else { "direct" };
    let detail = match source {
        Source::DirectUrl(url) => match filename_from_url_path(url) {
            Some(name) => {
                let name = sanitize_filename(&name);
                let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
                format!("{} ({})", name, kind_for_extension(ext).as_str())
            }
            None => "name from server".to_string(),
        },
        Source::Magnet(uri) => uri.clone(),
        Source::TorrentFile(path) => path.display().to_string(),
    };
    format!("{}\t{}\t{}", source.kind(), transport, detail)
}

pub fn run_classify(reference: &str) -> Result<()> {
    let source = source::classify(reference)?;
    println!("{}", describe(&source));
    Ok(())
}
