use std::{path::PathBuf, time::Duration};

use crate::{error::Result, planner};

/// Immutable settings shared by every request.
///
/// Built once at startup and passed by reference into the gate, the planner,
/// and the acquisition stage, so tests can run pipelines with different
/// budgets side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Largest file sent as a single message.
    pub size_budget_bytes: u64,
    /// Encoding rate requested from the downloader, in bits per second.
    pub bitrate_bps: u64,
    /// Extension of the extracted audio (`mp3`).
    pub audio_format: String,
    /// Where per-request files are written.
    pub work_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(
        size_budget_bytes: u64,
        bitrate_kbps: u32,
        audio_format: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            size_budget_bytes,
            bitrate_bps: u64::from(bitrate_kbps) * 1000,
            audio_format: audio_format.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Quality argument for the downloader. Derived from the same bitrate the
    /// planner uses, so the two cannot drift apart.
    pub fn audio_quality(&self) -> String {
        format!("{}K", self.bitrate_bps / 1000)
    }

    /// Segment duration for oversized files.
    pub fn planned_segment_seconds(&self) -> Result<u64> {
        planner::plan_segment_seconds(self.size_budget_bytes, self.bitrate_bps)
    }

    /// Startup sanity check: fails with the same error a request would hit
    /// when the budget cannot hold one second of audio.
    pub fn check(&self) -> Result<Duration> {
        self.planned_segment_seconds().map(Duration::from_secs)
    }
}
