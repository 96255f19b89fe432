//! Subprocess-backed implementations of the acquisition and split tools.

pub mod ffmpeg;
pub mod process;
pub mod ytdlp;

use std::path::PathBuf;

pub use {ffmpeg::Ffmpeg, ytdlp::YtDlp};

/// Find a binary at an explicit path or in `$PATH`.
///
/// If `configured` is set it must point at an existing file; it is not
/// silently replaced by a `$PATH` match.
pub fn find_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    match configured {
        Some(path) => {
            let path = PathBuf::from(path);
            path.is_file().then_some(path)
        },
        None => which::which(name).ok(),
    }
}
