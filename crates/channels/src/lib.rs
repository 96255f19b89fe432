//! Outbound transport seam.
//!
//! A channel (Telegram today) implements [`ChannelOutbound`] so the delivery
//! pipeline can reply with text and upload audio files without knowing which
//! messaging platform sits behind it.

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::ChannelOutbound,
};
