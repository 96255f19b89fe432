//! ffmpeg segmentation tool: fixed-duration, codec-copy split.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use {async_trait::async_trait, tokio::process::Command, tokio_util::sync::CancellationToken};

use super::process::run_tool;
use crate::{
    error::{Error, Result},
    segment::SegmentTool,
};

pub const BINARY_NAME: &str = "ffmpeg";

#[derive(Clone, Debug)]
pub struct Ffmpeg {
    binary: PathBuf,
    timeout: Duration,
}

impl Ffmpeg {
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

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

fn build_args(input: &Path, segment_seconds: u64, output_pattern: &Path) -> Vec<OsString> {
    let seconds = segment_seconds.to_string();
    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostdin",
        "-y",
        "-i",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(input.as_os_str().to_owned());
    args.extend(
        [
            "-map",
            "0:a",
            "-f",
            "segment",
            "-segment_time",
            seconds.as_str(),
            "-segment_start_number",
            "0",
            "-reset_timestamps",
            "1",
            "-c",
            "copy",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output_pattern.as_os_str().to_owned());
    args
}

#[async_trait]
impl SegmentTool for Ffmpeg {
    async fn segment(
        &self,
        input: &Path,
        segment_seconds: u64,
        output_pattern: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(build_args(input, segment_seconds, output_pattern));

        let output = run_tool(BINARY_NAME, cmd, self.timeout, cancel).await?;
        if !output.success() {
            return Err(Error::segmentation(format!(
                "{BINARY_NAME} failed ({}): {}",
                output.describe_exit(),
                output.diagnostics()
            )));
        }
        Ok(())
    }
}
