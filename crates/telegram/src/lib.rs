//! Telegram transport for tunedrop.
//!
//! Receives messages by long polling through teloxide, hands each one to the
//! delivery pipeline on its own task, and implements `ChannelOutbound` so the
//! pipeline can reply and upload audio.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod text;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_support;

pub use {
    bot::{BotClients, PollingHandle, PollingOptions, connect, start_polling},
    error::{Error, Result},
    outbound::TelegramOutbound,
};
