/// Config schema types (bot credentials, delivery limits, external tools).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Telegram's bot upload ceiling is 50 MB; stay a full MiB below it so
/// container headers and multipart overhead never push a part over.
pub const DEFAULT_SIZE_BUDGET_BYTES: u64 = 49 * 1024 * 1024;

/// Constant bitrate requested from the downloader. The segment planner uses
/// the same value to turn the byte budget into a duration.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;

/// Root configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunedropConfig {
    /// Bot token from @BotFather.
    #[serde(alias = "bot-token", serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// Verbose logging of inbound updates and pipeline transitions.
    #[serde(alias = "debug-mode")]
    pub debug_mode: bool,

    /// Directory for transient downloads. Defaults to `<tmp>/tunedrop`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    pub delivery: DeliveryConfig,
    pub tools: ToolsConfig,
}

impl TunedropConfig {
    /// Work directory with the default applied.
    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tunedrop"))
    }
}

impl std::fmt::Debug for TunedropConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunedropConfig")
            .field("bot_token", &"[REDACTED]")
            .field("debug_mode", &self.debug_mode)
            .field("work_dir", &self.work_dir)
            .field("delivery", &self.delivery)
            .field("tools", &self.tools)
            .finish()
    }
}

impl Default for TunedropConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            debug_mode: false,
            work_dir: None,
            delivery: DeliveryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Size and encoding limits for outgoing audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Largest file sent in one message; anything bigger is split.
    pub size_budget_bytes: u64,
    /// Audio bitrate in kbit/s, used both for downloading and for planning
    /// segment durations.
    pub audio_bitrate_kbps: u32,
    /// Container/codec extracted by the downloader (`mp3`).
    pub audio_format: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            size_budget_bytes: DEFAULT_SIZE_BUDGET_BYTES,
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            audio_format: "mp3".into(),
        }
    }
}

/// External binaries and their time limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit `yt-dlp` path; `$PATH` is searched when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt_dlp_path: Option<String>,
    /// Explicit `ffmpeg` path; `$PATH` is searched when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
    pub acquire_timeout_secs: u64,
    pub segment_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            ffmpeg_path: None,
            acquire_timeout_secs: 900,
            segment_timeout_secs: 300,
        }
    }
}
