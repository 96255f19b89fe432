use std::{
    borrow::Cow,
    error::Error as StdError,
    path::{Path, PathBuf},
};

/// Everything that can abort a delivery request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inbound text is not a supported source URL.
    #[error("{message}")]
    InvalidInput { message: String },

    /// The download tool failed or reported nothing usable.
    #[error("{message}")]
    AcquisitionFailure { message: String },

    /// The file the download tool should have produced cannot be stat-ed.
    /// Only the file name is shown; the message reaches chat users.
    #[error("downloaded file {} is unreadable: {source}", file_label(.path))]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not even one second of audio fits in the size budget.
    #[error(
        "size budget of {budget_bytes} bytes cannot hold one second of audio at {bitrate_bps} bit/s"
    )]
    BudgetTooSmall { budget_bytes: u64, bitrate_bps: u64 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The split tool failed, or succeeded without producing any part.
    #[error("splitting failed: {message}")]
    SegmentationFailure { message: String },

    /// Sending part `index` (0-based) failed; later parts were not sent.
    #[error("could not send part {} of {total}: {cause}", .index + 1)]
    DeliveryFailure {
        index: usize,
        total: usize,
        #[source]
        cause: Box<dyn StdError + Send + Sync>,
    },

    /// A subprocess was killed because its request was cancelled.
    #[error("{tool} was cancelled")]
    Cancelled { tool: &'static str },

    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: &'static str, secs: u64 },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::AcquisitionFailure {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn segmentation(message: impl Into<String>) -> Self {
        Self::SegmentationFailure {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Cancellation and timeouts come from the runtime, not from the tool's
    /// own verdict, and are reported as-is rather than re-wrapped.
    #[must_use]
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::TimedOut { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn file_label(path: &Path) -> Cow<'_, str> {
    match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => path.to_string_lossy(),
    }
}
