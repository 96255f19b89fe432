//! yt-dlp acquisition tool.
//!
//! Extracts the audio track of a single video, re-encoded to the configured
//! format and bitrate. Installation: `pipx install yt-dlp` or a distro
//! package; ffmpeg must be available to yt-dlp for the extraction step.

use std::{ffi::OsString, path::PathBuf, time::Duration};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use super::process::run_tool;
use crate::{
    acquire::{AcquireRequest, AcquireTool},
    error::{Error, Result},
};

pub const BINARY_NAME: &str = "yt-dlp";

#[derive(Clone, Debug)]
pub struct YtDlp {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Resolve the binary from config or `$PATH`.
    pub fn locate(configured: Option<&str>, timeout: Duration) -> Result<Self> {
        super::find_binary(BINARY_NAME, configured)
            .map(|binary| Self::new(binary, timeout))
            .ok_or_else(|| {
                Error::invalid_configuration(match configured {
                    Some(path) => format!("{BINARY_NAME} not found at {path}"),
                    None => format!("{BINARY_NAME} not found in PATH"),
                })
            })
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }
}

fn build_args(request: &AcquireRequest<'_>) -> Vec<OsString> {
    vec![
        "--extract-audio".into(),
        "--audio-format".into(),
        request.audio_format.into(),
        "--audio-quality".into(),
        request.audio_quality.into(),
        "--no-playlist".into(),
        "--no-progress".into(),
        "--output".into(),
        request.output_template.as_os_str().to_owned(),
        // The URL is validated upstream, but never let it parse as a flag.
        "--".into(),
        request.url.into(),
    ]
}

#[async_trait]
impl AcquireTool for YtDlp {
    async fn fetch(&self, request: AcquireRequest<'_>, cancel: &CancellationToken) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(build_args(&request));

        let output = run_tool(BINARY_NAME, cmd, self.timeout, cancel).await?;
        debug!(url = request.url, output = %output.stdout.trim(), "yt-dlp output");

        if !output.success() {
            return Err(Error::acquisition(format!(
                "{BINARY_NAME} failed ({}): {}",
                output.describe_exit(),
                output.diagnostics()
            )));
        }
        Ok(())
    }
}
