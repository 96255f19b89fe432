//! Direct-or-split routing by file size.

use tracing::{debug, warn};

use tunedrop_common::Artifact;

use crate::error::{Error, Result};

/// Where an acquired artifact goes next.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Small enough to send as one message.
    Direct(Artifact),
    /// Larger than the budget; must be segmented first.
    NeedsSplit(Artifact),
}

/// Routes artifacts against a fixed byte budget.
#[derive(Debug, Clone, Copy)]
pub struct SizeGate {
    budget_bytes: u64,
}

impl SizeGate {
    pub fn new(budget_bytes: u64) -> Self {
        Self { budget_bytes }
    }

    /// Stat the artifact and route it. A file exactly at the budget goes out
    /// directly; only strictly larger files are split.
    ///
    /// A missing or non-stat-able file means the download tool exited cleanly
    /// without producing output, reported as [`Error::ArtifactUnreadable`].
    pub async fn route(&self, artifact: Artifact) -> Result<Route> {
        let size = match artifact.size().await {
            Ok(size) => size,
            Err(source) => {
                warn!(path = %artifact.path().display(), error = %source, "cannot stat downloaded file");
                return Err(Error::ArtifactUnreadable {
                    path: artifact.path().to_path_buf(),
                    source,
                });
            },
        };

        let split = size > self.budget_bytes;
        debug!(
            path = %artifact.path().display(),
            bytes = size,
            budget_bytes = self.budget_bytes,
            split,
            "routed artifact"
        );

        Ok(if split {
            Route::NeedsSplit(artifact)
        } else {
            Route::Direct(artifact)
        })
    }
}
