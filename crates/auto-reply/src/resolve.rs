//! Decide which media a command operates on.

use {
    stickerbot_channels::InboundMessage,
    stickerbot_common::types::MediaPayload,
    tracing::debug,
};

use crate::error::{Error, Result};

/// Resolve the media payload targeted by `message`.
///
/// Media attached to the message itself wins; otherwise, if the message
/// quotes another one carrying media, that media is used. Anything else is
/// [`Error::NoMediaFound`].
pub async fn resolve(message: &dyn InboundMessage) -> Result<MediaPayload> {
    if message.has_media() {
        return download(message, "direct").await;
    }

    if message.has_quoted_message()
        && let Some(quoted) = message
            .quoted_message()
            .await
            .map_err(|e| Error::channel("fetching quoted message", e))?
        && quoted.has_media()
    {
        return download(quoted.as_ref(), "quoted").await;
    }

    Err(Error::NoMediaFound)
}

async fn download(message: &dyn InboundMessage, source: &'static str) -> Result<MediaPayload> {
    let payload = message
        .download_media()
        .await
        .map_err(|e| Error::channel("downloading media", e))?;

    match payload {
        Some(payload) if !payload.is_empty() => {
            debug!(
                source,
                mime_type = %payload.mime_type,
                bytes = payload.data.len(),
                "resolved media"
            );
            Ok(payload)
        },
        _ => {
            debug!(source, "media download came back empty");
            Err(Error::NoMediaFound)
        },
    }
}
