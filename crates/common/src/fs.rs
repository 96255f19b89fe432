use std::{io, path::Path};

use tracing::{debug, warn};

/// Remove a file, treating "already gone" as success.
///
/// Returns `Ok(true)` when a file was removed and `Ok(false)` when nothing
/// existed at `path`.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Best-effort variant of [`remove_if_exists`] for cleanup paths: failures are
/// logged, never returned.
pub async fn discard(path: &Path) {
    match remove_if_exists(path).await {
        Ok(true) => debug!(path = %path.display(), "removed local file"),
        Ok(false) => debug!(path = %path.display(), "local file already removed"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove local file"),
    }
}
