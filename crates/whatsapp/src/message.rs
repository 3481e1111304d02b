//! Adapts sidecar wire messages to the channel's [`InboundMessage`].

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    stickerbot_channels::InboundMessage,
    stickerbot_common::types::{MediaPayload, OutboundMedia, Reply},
};

use crate::{
    sidecar::SidecarHandle,
    types::{GatewayMessage, WireMessage},
};

/// One received WhatsApp message. Replies go to its chat, quoting it.
pub struct WhatsAppMessage {
    wire: WireMessage,
    /// Chat to answer in. For a quoted message this is still the chat of the
    /// message that quoted it.
    chat_id: String,
    sidecar: SidecarHandle,
}

impl WhatsAppMessage {
    pub fn new(wire: WireMessage, sidecar: SidecarHandle) -> Self {
        Self {
            chat_id: wire.chat_id.clone(),
            wire,
            sidecar,
        }
    }

    fn outbound(&self, reply: Reply) -> GatewayMessage {
        let request_id = uuid::Uuid::new_v4().to_string();
        let to = self.chat_id.clone();
        let quoted_message_id = Some(self.wire.id.clone());
        match reply {
            Reply::Text(text) => GatewayMessage::SendText {
                request_id,
                to,
                quoted_message_id,
                text,
            },
            Reply::Media(media) => media_frame(request_id, to, quoted_message_id, media),
        }
    }
}

fn media_frame(
    request_id: String,
    to: String,
    quoted_message_id: Option<String>,
    media: OutboundMedia,
) -> GatewayMessage {
    let data = media.to_base64();
    let (sticker_author, sticker_name, sticker_categories) = match media.sticker {
        Some(sticker) => (
            Some(sticker.author),
            Some(sticker.pack_name),
            sticker.categories,
        ),
        None => (None, None, Vec::new()),
    };
    GatewayMessage::SendMedia {
        request_id,
        to,
        quoted_message_id,
        mime_type: media.mime_type,
        data,
        filename: media.filename,
        send_as_sticker: media.send_as_sticker,
        send_as_animation: media.send_as_animation,
        sticker_author,
        sticker_name,
        sticker_categories,
    }
}

#[async_trait]
impl InboundMessage for WhatsAppMessage {
    fn body(&self) -> &str {
        &self.wire.body
    }

    fn has_media(&self) -> bool {
        self.wire.has_media || self.wire.media.is_some()
    }

    fn has_quoted_message(&self) -> bool {
        self.wire.quoted.is_some()
    }

    async fn quoted_message(&self) -> Result<Option<Box<dyn InboundMessage>>> {
        Ok(self.wire.quoted.as_ref().map(|quoted| {
            Box::new(Self {
                wire: quoted.as_ref().clone(),
                chat_id: self.chat_id.clone(),
                sidecar: self.sidecar.clone(),
            }) as Box<dyn InboundMessage>
        }))
    }

    async fn download_media(&self) -> Result<Option<MediaPayload>> {
        let Some(media) = &self.wire.media else {
            return Ok(None);
        };
        let mut payload = MediaPayload::from_base64(&media.data, &media.mime_type)
            .with_context(|| format!("decoding media of message {}", self.wire.id))?;
        if let Some(filename) = &media.filename {
            payload = payload.with_filename(filename);
        }
        Ok(Some(payload))
    }

    async fn reply(&self, reply: Reply) -> Result<()> {
        self.sidecar.request(self.outbound(reply)).await
    }
}
