//! Per-request orchestration: validate, acquire, route, split, deliver.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    tunedrop_channels::ChannelOutbound,
    tunedrop_common::{Artifact, RequestContext},
};

use crate::{
    acquire::{AcquireTool, Acquirer},
    delivery::DeliveryManager,
    error::{Error, Result},
    gate::{Route, SizeGate},
    pipeline::PipelineConfig,
    segment::{SegmentTool, Segmenter},
    source_url::is_supported_url,
};

pub const VALIDATION_MESSAGE: &str = "Please send a valid YouTube video URL.";
pub const ACK_MESSAGE: &str = "Starting to process your request...";
const DOWNLOAD_ERROR_PREFIX: &str = "Error downloading audio";
const DELIVERY_ERROR_PREFIX: &str = "Error sending audio";

/// Lifecycle of one request. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Acquiring,
    Routing,
    Delivering,
    Done,
    Aborted,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Acquiring => "acquiring",
            Self::Routing => "routing",
            Self::Delivering => "delivering",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// How a request ended.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Every part was delivered.
    Done { parts: usize },
    /// The request stopped in state `at`; the user was told why.
    Aborted { at: RequestState, error: Error },
}

impl RequestOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Runs one inbound message through the delivery pipeline.
///
/// Shared by all concurrent requests; holds no per-request state.
pub struct RequestHandler {
    config: Arc<PipelineConfig>,
    acquirer: Acquirer,
    gate: SizeGate,
    segmenter: Segmenter,
    delivery: DeliveryManager,
    outbound: Arc<dyn ChannelOutbound>,
}

impl RequestHandler {
    pub fn new(
        config: PipelineConfig,
        acquire_tool: Arc<dyn AcquireTool>,
        segment_tool: Arc<dyn SegmentTool>,
        outbound: Arc<dyn ChannelOutbound>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            acquirer: Acquirer::new(acquire_tool, Arc::clone(&config)),
            gate: SizeGate::new(config.size_budget_bytes),
            segmenter: Segmenter::new(segment_tool),
            delivery: DeliveryManager::new(Arc::clone(&outbound)),
            outbound,
            config,
        }
    }

    /// Handle one inbound text.
    ///
    /// Never fails: every error is turned into a single reply to the sender
    /// and returned as [`RequestOutcome::Aborted`]. A request that delivered
    /// only some of its parts is aborted as a whole.
    pub async fn handle(&self, raw_text: &str, ctx: &RequestContext) -> RequestOutcome {
        #[cfg(feature = "metrics")]
        metrics::counter!("tunedrop_requests_total").increment(1);

        let url = raw_text.trim();
        if !is_supported_url(url) {
            debug!(chat_id = %ctx.session_id, "rejecting input that is not a supported URL");
            self.reply(ctx, VALIDATION_MESSAGE).await;
            return RequestOutcome::Aborted {
                at: RequestState::Received,
                error: Error::invalid_input(VALIDATION_MESSAGE),
            };
        }

        let mut state = RequestState::Received;
        advance(&mut state, RequestState::Validated, ctx);
        self.reply(ctx, ACK_MESSAGE).await;

        advance(&mut state, RequestState::Acquiring, ctx);
        let result = self.run(url, ctx, &mut state).await;
        self.sweep(ctx).await;

        match result {
            Ok(parts) => {
                advance(&mut state, RequestState::Done, ctx);
                info!(chat_id = %ctx.session_id, parts, "request completed");
                RequestOutcome::Done { parts }
            },
            Err(error) => {
                #[cfg(feature = "metrics")]
                metrics::counter!("tunedrop_requests_failed_total").increment(1);

                let prefix = if state == RequestState::Acquiring
                    || matches!(error, Error::ArtifactUnreadable { .. })
                {
                    DOWNLOAD_ERROR_PREFIX
                } else {
                    DELIVERY_ERROR_PREFIX
                };
                warn!(
                    chat_id = %ctx.session_id,
                    state = %state,
                    error = %error,
                    "request aborted"
                );
                self.reply(ctx, &format!("{prefix}: {error}")).await;
                let at = state;
                advance(&mut state, RequestState::Aborted, ctx);
                RequestOutcome::Aborted { at, error }
            },
        }
    }

    async fn run(&self, url: &str, ctx: &RequestContext, state: &mut RequestState) -> Result<usize> {
        let artifact = self.acquirer.acquire(url, ctx).await?;

        advance(state, RequestState::Routing, ctx);
        let parts = match self.gate.route(artifact).await? {
            Route::Direct(artifact) => vec![artifact],
            Route::NeedsSplit(source) => self.split(source, ctx).await?,
        };

        advance(state, RequestState::Delivering, ctx);
        let count = parts.len();
        self.delivery.deliver(ctx, parts).await?;
        Ok(count)
    }

    /// Replace an oversized source by its parts. The source is deleted here,
    /// once segmentation has finished, whatever its outcome.
    async fn split(&self, source: Artifact, ctx: &RequestContext) -> Result<Vec<Artifact>> {
        #[cfg(feature = "metrics")]
        metrics::counter!("tunedrop_splits_total").increment(1);

        let parts = match self.config.planned_segment_seconds() {
            Ok(seconds) => {
                info!(
                    chat_id = %ctx.session_id,
                    seconds,
                    budget_bytes = self.config.size_budget_bytes,
                    "file exceeds size budget, splitting"
                );
                self.segmenter.segment(&source, seconds, &ctx.cancel).await
            },
            Err(e) => Err(e),
        };
        source.discard().await;
        Ok(parts?.into_vec())
    }

    /// Best-effort reply: a failed send is logged and otherwise ignored.
    async fn reply(&self, ctx: &RequestContext, text: &str) {
        if let Err(e) = self.outbound.send_text(&ctx.session_id, text).await {
            warn!(chat_id = %ctx.session_id, error = %e, "failed to send reply");
        }
    }

    /// Remove every file left in the work directory under this request's
    /// stem: downloader intermediates, a source left after a failed split,
    /// stray parts.
    async fn sweep(&self, ctx: &RequestContext) {
        let prefix = format!("{}.", ctx.file_stem());
        let mut entries = match tokio::fs::read_dir(&self.config.work_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %self.config.work_dir.display(),
                    error = %e,
                    "cannot list work dir for cleanup"
                );
                return;
            },
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if entry.file_name().to_string_lossy().starts_with(&prefix) {
                        tunedrop_common::fs::discard(&entry.path()).await;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "work dir listing failed during cleanup");
                    break;
                },
            }
        }
    }
}

fn advance(state: &mut RequestState, next: RequestState, ctx: &RequestContext) {
    debug!(chat_id = %ctx.session_id, from = %state, to = %next, "request state");
    *state = next;
}
