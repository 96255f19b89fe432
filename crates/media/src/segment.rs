//! Splitting oversized audio into fixed-duration parts.
//!
//! Parts are named `<stem>.part<NNN>.<ext>` next to the source. After the
//! split tool exits, parts are rediscovered by probing those names from index
//! 0 upward until the first missing one; the tool's own report of what it
//! wrote is never trusted, since its output format is not stable across
//! versions.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use tunedrop_common::Artifact;

use crate::error::{Error, Result};

/// Width of the zero-padded part index.
const PART_INDEX_WIDTH: usize = 3;

/// External re-segmentation capability (ffmpeg in production).
#[async_trait]
pub trait SegmentTool: Send + Sync {
    /// Split `input` into codec-copied parts of `segment_seconds` each,
    /// writing them to `output_pattern` (contains a `%03d` index placeholder
    /// starting at 0).
    async fn segment(
        &self,
        input: &Path,
        segment_seconds: u64,
        output_pattern: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Ordered parts of one source file, index 0 first.
#[derive(Debug)]
pub struct PartSet {
    parts: Vec<Artifact>,
}

impl PartSet {
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(Artifact::path)
    }

    pub fn into_vec(self) -> Vec<Artifact> {
        self.parts
    }
}

/// `<dir>/<stem>.part%03d.<ext>` for the split tool.
pub fn part_pattern(source: &Path) -> PathBuf {
    part_file_name(source, &format!("%0{width}d", width = PART_INDEX_WIDTH))
}

/// Path of part `index` of `source`.
pub fn part_path(source: &Path, index: usize) -> PathBuf {
    part_file_name(source, &format!("{index:0width$}", width = PART_INDEX_WIDTH))
}

fn part_file_name(source: &Path, index: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}.part{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}.part{index}"),
    };
    source.with_file_name(name)
}

/// Probe `part_path(source, 0..)` and stop at the first index with no file.
pub async fn discover_parts(source: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    loop {
        let candidate = part_path(source, found.len());
        match tokio::fs::try_exists(&candidate).await {
            Ok(true) => found.push(candidate),
            Ok(false) => break,
            Err(e) => {
                warn!(path = %candidate.display(), error = %e, "cannot probe part, stopping discovery");
                break;
            },
        }
    }
    found
}

/// Drives the split tool and collects its output.
#[derive(Clone)]
pub struct Segmenter {
    tool: Arc<dyn SegmentTool>,
}

impl Segmenter {
    pub fn new(tool: Arc<dyn SegmentTool>) -> Self {
        Self { tool }
    }

    /// Split `source` into parts of `planned_seconds` (the last may be
    /// shorter).
    ///
    /// The source file is left untouched; deleting it is the caller's job.
    /// On failure every part that was already written is removed before the
    /// error is returned.
    pub async fn segment(
        &self,
        source: &Artifact,
        planned_seconds: u64,
        cancel: &CancellationToken,
    ) -> Result<PartSet> {
        let pattern = part_pattern(source.path());
        debug!(
            source = %source.path().display(),
            pattern = %pattern.display(),
            seconds = planned_seconds,
            "segmenting"
        );

        let outcome = self
            .tool
            .segment(source.path(), planned_seconds, &pattern, cancel)
            .await;
        let found = discover_parts(source.path()).await;

        let failure = match outcome {
            Ok(()) if found.is_empty() => Error::segmentation("the split produced no parts"),
            Ok(()) => {
                info!(
                    source = %source.path().display(),
                    parts = found.len(),
                    seconds = planned_seconds,
                    "segmented audio"
                );
                let parts = found
                    .into_iter()
                    .map(|path| Artifact::new(path, source.request_id()))
                    .collect();
                return Ok(PartSet { parts });
            },
            Err(e) if e.is_interruption() => e,
            Err(Error::SegmentationFailure { message }) => Error::segmentation(message),
            Err(e) => Error::segmentation(e.to_string()),
        };

        if !found.is_empty() {
            warn!(
                source = %source.path().display(),
                parts = found.len(),
                "removing partial split output"
            );
        }
        for path in &found {
            tunedrop_common::fs::discard(path).await;
        }
        Err(failure)
    }
}
