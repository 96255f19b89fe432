use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio::task::{JoinError, JoinHandle},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{debug, info, warn},
};

use tunedrop_media::RequestHandler;

use crate::{error::Result, handlers};

/// Long-polling timeout sent to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;
/// Pause after a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);
/// HTTP timeout of the polling client. Must outlast the long-polling
/// timeout, otherwise the client aborts before Telegram answers.
const POLL_CLIENT_TIMEOUT: Duration = Duration::from_secs(45);
/// HTTP timeout of the upload client: a full-size part on a slow uplink.
const UPLOAD_CLIENT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, Default)]
pub struct PollingOptions {
    /// Log every inbound update.
    pub debug_mode: bool,
}

/// Two clients for one token, differing only in their HTTP timeout.
#[derive(Clone)]
pub struct BotClients {
    /// Long polling and other short calls.
    pub polling: Bot,
    /// Replies and audio uploads.
    pub uploads: Bot,
}

impl BotClients {
    fn with_timeouts(token: &str, polling: Duration, uploads: Duration) -> Result<Self> {
        Ok(Self {
            polling: bot_with_timeout(token, polling)?,
            uploads: bot_with_timeout(token, uploads)?,
        })
    }
}

fn bot_with_timeout(token: &str, timeout: Duration) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(timeout)
        .build()?;
    Ok(Bot::with_client(token, client))
}

/// Build the bot clients and verify the token.
///
/// Also clears any webhook so that long polling receives updates.
pub async fn connect(token: &Secret<String>) -> Result<BotClients> {
    let bots = BotClients::with_timeouts(
        token.expose_secret(),
        POLL_CLIENT_TIMEOUT,
        UPLOAD_CLIENT_TIMEOUT,
    )?;

    let me = bots.polling.get_me().await?;
    bots.polling.delete_webhook().send().await?;

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");
    Ok(bots)
}

/// The polling loop plus every request task it started.
pub struct PollingHandle {
    task: JoinHandle<()>,
    requests: TaskTracker,
}

impl PollingHandle {
    /// Wait for the loop to stop, then for every in-flight request to send
    /// its last reply and remove its files.
    pub async fn join(self) -> std::result::Result<(), JoinError> {
        let result = self.task.await;
        self.requests.close();
        self.requests.wait().await;
        debug!("all telegram request tasks finished");
        result
    }
}

/// Poll for messages until `cancel` fires.
///
/// Each message is handled on its own tracked task with a child of
/// `cancel`, so a slow download never blocks the loop and shutdown reaches
/// every request.
pub fn start_polling(
    bot: Bot,
    handler: Arc<RequestHandler>,
    options: PollingOptions,
    cancel: CancellationToken,
) -> PollingHandle {
    let requests = TaskTracker::new();
    let tracker = requests.clone();
    let task = tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(POLL_TIMEOUT_SECS)
                    .allowed_updates(vec![AllowedUpdate::Message])
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        if options.debug_mode {
                            debug!(update = ?update, "telegram update");
                        }
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                let handler = Arc::clone(&handler);
                                let cancel = cancel.child_token();
                                tracker.spawn(async move {
                                    handlers::handle_message(msg, &handler, cancel).await;
                                });
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    if is_conflict(&e) {
                        warn!(
                            "telegram polling stopped: another instance is already running with this token"
                        );
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }

        info!("telegram polling stopped");
    });
    PollingHandle { task, requests }
}

fn is_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}
