use std::{
    io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tokio_util::sync::CancellationToken;

/// Identity of one inbound message.
///
/// The session id routes replies back to the sender; together with the
/// arrival timestamp it namespaces every local file the request creates, so
/// concurrent requests never share a path.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque recipient/session id (a Telegram chat id, for example).
    pub session_id: String,
    /// Arrival time in nanoseconds since the Unix epoch.
    pub received_at_nanos: u128,
    /// Cancelled when the request should stop (process shutdown).
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context stamped with the current time.
    pub fn new(session_id: impl Into<String>, cancel: CancellationToken) -> Self {
        let received_at_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self::with_timestamp(session_id, received_at_nanos, cancel)
    }

    pub fn with_timestamp(
        session_id: impl Into<String>,
        received_at_nanos: u128,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            received_at_nanos,
            cancel,
        }
    }

    /// File stem shared by every local file of this request:
    /// `download_<session>_<nanos>`.
    pub fn file_stem(&self) -> String {
        format!("download_{}_{}", self.session_id, self.received_at_nanos)
    }
}

/// A locally stored audio file owned by exactly one pipeline stage.
///
/// Not `Clone`: stages that consume an artifact take it by value, so a file
/// cannot be read through one handle after another handle deleted it.
#[derive(Debug, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    request_id: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, request_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            request_id: request_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity of the request that produced this file.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Current size on disk. Measured on every call, never cached.
    pub async fn size(&self) -> io::Result<u64> {
        tokio::fs::metadata(&self.path).await.map(|m| m.len())
    }

    /// Delete the file, logging instead of returning failures.
    pub async fn discard(self) {
        crate::fs::discard(&self.path).await;
    }
}
