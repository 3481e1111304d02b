use std::{error::Error as StdError, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The payload handed to a transcoder was empty.
    #[error("no media to transcode")]
    NoMedia,

    /// The conversion engine exited with a failure status.
    #[error("conversion engine failed: {diagnostic}")]
    Engine { diagnostic: String },

    /// The conversion engine did not report completion in time.
    #[error("conversion engine timed out after {}s", after.as_secs())]
    Timeout { after: Duration },

    /// Workspace read/write failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine reported success but the produced file breaks the recipe's
    /// output constraints.
    #[error("invalid engine output: {message}")]
    InvalidOutput { message: String },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn engine(diagnostic: impl Into<String>) -> Self {
        Self::Engine {
            diagnostic: diagnostic.into(),
        }
    }

    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
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

    /// Whether the failure came from the conversion engine itself (non-zero
    /// exit or timeout) rather than the surrounding I/O.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Engine { .. } | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
