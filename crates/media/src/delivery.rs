//! Ordered upload of one or more audio files.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    tunedrop_channels::ChannelOutbound,
    tunedrop_common::{Artifact, RequestContext},
};

use crate::error::{Error, Result};

/// Sends artifacts through the outbound channel and owns their cleanup.
#[derive(Clone)]
pub struct DeliveryManager {
    outbound: Arc<dyn ChannelOutbound>,
}

impl DeliveryManager {
    pub fn new(outbound: Arc<dyn ChannelOutbound>) -> Self {
        Self { outbound }
    }

    /// Upload `artifacts` one at a time, in order.
    ///
    /// Each local file is deleted right after its upload attempt, whether the
    /// upload worked or not. The first failure stops the run: artifacts after
    /// it are never sent, but since this manager owns the whole sequence their
    /// files are deleted too before [`Error::DeliveryFailure`] is returned.
    /// Failed uploads are not retried here.
    pub async fn deliver(&self, ctx: &RequestContext, artifacts: Vec<Artifact>) -> Result<()> {
        let total = artifacts.len();
        let mut pending = artifacts.into_iter().enumerate();

        while let Some((index, artifact)) = pending.next() {
            if ctx.cancel.is_cancelled() {
                artifact.discard().await;
                discard_unsent(pending).await;
                return Err(Error::Cancelled { tool: "delivery" });
            }

            if let Err(e) = self.outbound.send_upload_action(&ctx.session_id).await {
                debug!(chat_id = %ctx.session_id, error = %e, "upload indicator not shown");
            }
            let sent = self
                .outbound
                .send_audio(&ctx.session_id, artifact.path())
                .await;
            artifact.discard().await;

            match sent {
                Ok(()) => {
                    debug!(
                        chat_id = %ctx.session_id,
                        part_index = index,
                        total,
                        "sent audio part"
                    );
                    #[cfg(feature = "metrics")]
                    metrics::counter!("tunedrop_parts_delivered_total").increment(1);
                },
                Err(cause) => {
                    warn!(
                        chat_id = %ctx.session_id,
                        part_index = index,
                        total,
                        error = %cause,
                        "audio upload failed, abandoning remaining parts"
                    );
                    discard_unsent(pending).await;
                    return Err(Error::DeliveryFailure {
                        index,
                        total,
                        cause: cause.into(),
                    });
                },
            }
        }

        info!(chat_id = %ctx.session_id, total, "delivered audio");
        Ok(())
    }
}

async fn discard_unsent(rest: impl Iterator<Item = (usize, Artifact)>) {
    for (_, artifact) in rest {
        artifact.discard().await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        std::{
            path::{Path, PathBuf},
            sync::Mutex,
        },
        tokio_util::sync::CancellationToken,
    };

    /// Records every upload attempt and whether the file existed at that time.
    #[derive(Default)]
    struct RecordingOutbound {
        fail_on_attempt: Option<usize>,
        fail_upload_action: bool,
        attempts: Mutex<Vec<(PathBuf, bool)>>,
    }

    #[async_trait]
    impl ChannelOutbound for RecordingOutbound {
        async fn send_text(&self, _to: &str, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_audio(&self, _to: &str, path: &Path) -> anyhow::Result<()> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push((path.to_path_buf(), path.exists()));
            if self.fail_on_attempt == Some(attempts.len() - 1) {
                anyhow::bail!("Request Entity Too Large");
            }
            Ok(())
        }

        async fn send_upload_action(&self, _to: &str) -> anyhow::Result<()> {
            if self.fail_upload_action {
                anyhow::bail!("Too Many Requests");
            }
            Ok(())
        }
    }

    fn artifacts(dir: &Path, n: usize) -> Vec<Artifact> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("download_1_1.part{i:03}.mp3"));
                std::fs::write(&path, b"audio").unwrap();
                Artifact::new(path, "download_1_1")
            })
            .collect()
    }

    fn ctx() -> RequestContext {
        RequestContext::with_timestamp("1", 1, CancellationToken::new())
    }

    #[tokio::test]
    async fn sends_in_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 3);
        let expected: Vec<_> = items.iter().map(|a| a.path().to_path_buf()).collect();
        let outbound = Arc::new(RecordingOutbound::default());

        DeliveryManager::new(outbound.clone())
            .deliver(&ctx(), items)
            .await
            .unwrap();

        let attempts = outbound.attempts.lock().unwrap();
        let sent: Vec<_> = attempts.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(sent, expected);
        assert!(attempts.iter().all(|(_, existed)| *existed));
        assert!(expected.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn failing_upload_indicator_does_not_stop_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 2);
        let outbound = Arc::new(RecordingOutbound {
            fail_upload_action: true,
            ..Default::default()
        });

        DeliveryManager::new(outbound.clone())
            .deliver(&ctx(), items)
            .await
            .unwrap();

        assert_eq!(outbound.attempts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn third_of_five_failing_reports_index_two() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 5);
        let paths: Vec<_> = items.iter().map(|a| a.path().to_path_buf()).collect();
        let outbound = Arc::new(RecordingOutbound {
            fail_on_attempt: Some(2),
            ..Default::default()
        });

        let err = DeliveryManager::new(outbound.clone())
            .deliver(&ctx(), items)
            .await
            .unwrap_err();

        match &err {
            Error::DeliveryFailure { index, total, cause } => {
                assert_eq!(*index, 2);
                assert_eq!(*total, 5);
                assert!(cause.to_string().contains("Too Large"));
            },
            other => panic!("expected DeliveryFailure, got {other:?}"),
        }
        assert!(err.to_string().starts_with("could not send part 3 of 5"));

        // Parts 0..=2 were attempted, 3 and 4 never were.
        let attempts = outbound.attempts.lock().unwrap();
        let sent: Vec<_> = attempts.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(sent, paths[..3].to_vec());

        // Every file handed over is gone, attempted or not.
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn failing_single_file_is_still_removed() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 1);
        let path = items[0].path().to_path_buf();
        let outbound = Arc::new(RecordingOutbound {
            fail_on_attempt: Some(0),
            ..Default::default()
        });

        let err = DeliveryManager::new(outbound)
            .deliver(&ctx(), items)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeliveryFailure { index: 0, total: 1, .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn already_deleted_file_does_not_break_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 2);
        std::fs::remove_file(items[1].path()).unwrap();
        let outbound = Arc::new(RecordingOutbound::default());

        DeliveryManager::new(outbound.clone())
            .deliver(&ctx(), items)
            .await
            .unwrap();
        assert_eq!(outbound.attempts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_request_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let items = artifacts(dir.path(), 2);
        let paths: Vec<_> = items.iter().map(|a| a.path().to_path_buf()).collect();
        let outbound = Arc::new(RecordingOutbound::default());
        let ctx = ctx();
        ctx.cancel.cancel();

        let err = DeliveryManager::new(outbound.clone())
            .deliver(&ctx, items)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert!(outbound.attempts.lock().unwrap().is_empty());
        assert!(paths.iter().all(|p| !p.exists()));
    }
}
