use {
    anyhow::Result,
    async_trait::async_trait,
    std::{future::Future, path::Path, time::Duration},
    teloxide::{
        RequestError,
        prelude::*,
        types::{ChatAction, ChatId, InputFile},
    },
    tracing::{debug, info, warn},
};

use tunedrop_channels::{ChannelOutbound, Error as ChannelError};

use crate::text::{TELEGRAM_MAX_MESSAGE_LEN, chunk_message};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound sender for one bot.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Honor Telegram's `retry_after` flood-control replies; any other error
    /// is returned as is.
    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn parse_chat_id(to: &str) -> std::result::Result<ChatId, ChannelError> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|_| ChannelError::invalid_recipient(to))
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let chunks = chunk_message(text, TELEGRAM_MAX_MESSAGE_LEN);

        for chunk in &chunks {
            self.run_telegram_request_with_retry(to, "send message", || {
                let req = self.bot.send_message(chat_id, chunk.as_str());
                async move { req.await }
            })
            .await?;
        }

        debug!(
            chat_id = to,
            text_len = text.len(),
            chunk_count = chunks.len(),
            "telegram outbound text sent"
        );
        Ok(())
    }

    async fn send_audio(&self, to: &str, path: &Path) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {},
            Ok(_) => {
                return Err(
                    ChannelError::invalid_upload(path.display(), "not a regular file").into(),
                );
            },
            Err(e) => return Err(ChannelError::invalid_upload(path.display(), e.to_string()).into()),
        }

        info!(chat_id = to, path = %path.display(), "telegram outbound audio send start");
        self.run_telegram_request_with_retry(to, "send audio", || {
            let req = self.bot.send_audio(chat_id, InputFile::file(path));
            async move { req.await }
        })
        .await?;
        info!(chat_id = to, path = %path.display(), "telegram outbound audio sent");
        Ok(())
    }

    async fn send_upload_action(&self, to: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.bot
            .send_chat_action(chat_id, ChatAction::UploadDocument)
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("-1001234567890", Some(-1_001_234_567_890))]
    #[case("@channel", None)]
    #[case("", None)]
    fn chat_ids(#[case] to: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_chat_id(to).ok().map(|c| c.0), expected);
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_any_request() {
        let outbound = TelegramOutbound::new(Bot::new("test-token"));
        let err = outbound.send_text("not-a-chat", "hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::InvalidRecipient { .. })
        ));
    }

    #[tokio::test]
    async fn missing_audio_file_is_rejected() {
        let outbound = TelegramOutbound::new(Bot::new("test-token"));
        let err = outbound
            .send_audio("42", Path::new("/nonexistent/download_1_2.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::InvalidUpload { .. })
        ));
    }
}
