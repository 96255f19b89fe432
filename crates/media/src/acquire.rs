//! Turning a source URL into a local audio file.

use std::{path::Path, sync::Arc};

use {async_trait::async_trait, tokio_util::sync::CancellationToken, tracing::debug};

use tunedrop_common::{Artifact, RequestContext};

use crate::{error::Result, pipeline::PipelineConfig};

/// Placeholder the download tool replaces with the real extension.
pub const EXTENSION_PLACEHOLDER: &str = "%(ext)s";

/// Arguments for one download.
#[derive(Debug, Clone, Copy)]
pub struct AcquireRequest<'a> {
    pub url: &'a str,
    /// Output path ending in [`EXTENSION_PLACEHOLDER`].
    pub output_template: &'a Path,
    /// Audio container/codec to extract (`mp3`).
    pub audio_format: &'a str,
    /// Tool-specific quality argument (`192K`).
    pub audio_quality: &'a str,
}

/// External acquisition capability (yt-dlp in production).
///
/// Implementations must leave exactly one file at the template with the
/// placeholder replaced by `audio_format`. Whether they did is checked by the
/// caller with a stat, not by parsing tool output.
#[async_trait]
pub trait AcquireTool: Send + Sync {
    async fn fetch(&self, request: AcquireRequest<'_>, cancel: &CancellationToken) -> Result<()>;
}

/// Downloads into per-request paths under the work directory.
#[derive(Clone)]
pub struct Acquirer {
    tool: Arc<dyn AcquireTool>,
    config: Arc<PipelineConfig>,
}

impl Acquirer {
    pub fn new(tool: Arc<dyn AcquireTool>, config: Arc<PipelineConfig>) -> Self {
        Self { tool, config }
    }

    /// Download `url` and hand back the artifact at its predictable path.
    ///
    /// The returned artifact's file is not checked for existence here; the
    /// size gate stats it and reports a missing file distinctly.
    pub async fn acquire(&self, url: &str, ctx: &RequestContext) -> Result<Artifact> {
        let stem = ctx.file_stem();
        let template = self
            .config
            .work_dir
            .join(format!("{stem}.{EXTENSION_PLACEHOLDER}"));
        let final_path = self
            .config
            .work_dir
            .join(format!("{stem}.{}", self.config.audio_format));
        let quality = self.config.audio_quality();

        debug!(
            chat_id = %ctx.session_id,
            url,
            template = %template.display(),
            "acquiring audio"
        );

        self.tool
            .fetch(
                AcquireRequest {
                    url,
                    output_template: &template,
                    audio_format: &self.config.audio_format,
                    audio_quality: &quality,
                },
                &ctx.cancel,
            )
            .await?;

        Ok(Artifact::new(final_path, stem))
    }
}
