use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across transport implementations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The recipient id cannot be interpreted by this channel.
    #[error("invalid recipient: {recipient}")]
    InvalidRecipient { recipient: String },

    /// A local file handed to the channel could not be used.
    #[error("cannot upload {path}: {message}")]
    InvalidUpload { path: String, message: String },

    /// Wrapped source error from the platform client.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_recipient(recipient: impl std::fmt::Display) -> Self {
        Self::InvalidRecipient {
            recipient: recipient.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_upload(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidUpload {
            path: path.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
