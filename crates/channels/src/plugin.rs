use std::path::Path;

use {anyhow::Result, async_trait::async_trait};

/// Send messages to a channel.
///
/// `to` is the opaque recipient id taken from the inbound request. Both sends
/// may fail with a transport-level error; callers decide whether that error
/// matters (replies are best-effort, audio uploads are not).
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send a plain-text reply.
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Upload a local audio file.
    async fn send_audio(&self, to: &str, path: &Path) -> Result<()>;

    /// Show an "uploading" indicator. No-op by default.
    async fn send_upload_action(&self, _to: &str) -> Result<()> {
        Ok(())
    }
}
