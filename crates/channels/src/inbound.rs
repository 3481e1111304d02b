use {
    anyhow::Result,
    async_trait::async_trait,
    stickerbot_common::types::{MediaPayload, Reply},
};

/// A received chat message, as handed over by the channel.
///
/// Read-only to the bot: it can inspect the text, fetch attached or quoted
/// media, and reply to the chat the message came from.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    /// Message text or media caption.
    fn body(&self) -> &str;

    /// Whether the message itself carries an attachment.
    fn has_media(&self) -> bool;

    /// Whether the message replies to (quotes) an earlier message.
    fn has_quoted_message(&self) -> bool;

    /// Fetch the quoted message. `None` when there is none or it is no longer
    /// available.
    async fn quoted_message(&self) -> Result<Option<Box<dyn InboundMessage>>>;

    /// Download the attachment. `None` when the message carries no media or
    /// the download came back empty.
    async fn download_media(&self) -> Result<Option<MediaPayload>>;

    /// Reply in the originating chat. May fail while the session is down.
    async fn reply(&self, reply: Reply) -> Result<()>;
}

/// Receives every inbound message of a channel.
///
/// Implementations must not fail: errors are reported back to the chat or
/// logged, never propagated into the channel's event loop.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: Box<dyn InboundMessage>);
}
