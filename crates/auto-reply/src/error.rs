use std::error::Error as StdError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the message nor the message it quotes carries media.
    #[error("no media found in the message or its quoted message")]
    NoMediaFound,

    /// The media type is not one the requested command can convert.
    #[error("unsupported media type {mime_type:?}")]
    UnsupportedFormat { mime_type: String },

    #[error(transparent)]
    Transcode(#[from] stickerbot_media::Error),

    /// The channel failed while fetching a quoted message or downloading.
    #[error("{context}: {source}")]
    Channel {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn channel(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Channel {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Expected outcomes caused by what the user sent. These get a corrective
    /// reply and are not logged as errors.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoMediaFound
                | Self::UnsupportedFormat { .. }
                | Self::Transcode(stickerbot_media::Error::NoMedia)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
